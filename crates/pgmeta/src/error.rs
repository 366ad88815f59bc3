//! Error types for pgmeta

use thiserror::Error;

/// Result type alias for pgmeta operations
pub type MetaResult<T> = Result<T, MetaError>;

/// Error types for introspection and statement building
#[derive(Debug, Error)]
pub enum MetaError {
    /// Column uses a schema feature this metadata model does not support
    /// (currently: array-typed columns)
    #[error("Array datatypes are not supported [{table}.{column}]")]
    UnsupportedColumn { table: String, column: String },

    /// A name lookup failed: unknown domain, table, or column, a missing
    /// sequence name, or a sub-select without a table
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// Caller misused the builder API (e.g. an operator that cannot be
    /// applied to an array operand)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// Query execution error, propagated unchanged from the driver
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl MetaError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an unresolved reference error
    pub fn unresolved(message: impl Into<String>) -> Self {
        Self::UnresolvedReference(message.into())
    }

    /// Create an invalid usage error
    pub fn invalid_usage(message: impl Into<String>) -> Self {
        Self::InvalidUsage(message.into())
    }

    /// Create an unsupported column error naming the offending table and column
    pub fn unsupported_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnsupportedColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for MetaError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
