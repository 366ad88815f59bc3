//! Row access utilities

use crate::error::MetaResult;
use tokio_postgres::Row;

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning MetaError::Decode on failure
    fn try_get_column<T>(&self, column: &str) -> MetaResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> MetaResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| crate::error::MetaError::decode(column, e.to_string()))
    }
}
