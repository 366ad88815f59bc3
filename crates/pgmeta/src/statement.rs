//! Parameterized SQL fragment holder.
//!
//! A [`Statement`] is a SQL text template paired with its ordered bound
//! values. Text and parameters are appended together as one atomic
//! operation, so the placeholder count always matches the parameter count
//! and positions can never drift apart.
//!
//! The portable template form uses `?` placeholders ([`Statement::sql`]);
//! for execution against Postgres the same parts render as `$1, $2, ...`
//! ([`Statement::to_pg_sql`]).

use crate::client::GenericClient;
use crate::error::MetaResult;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// One piece of a statement: raw SQL text or a parameter slot.
#[derive(Debug, Clone)]
enum Part {
    Raw(String),
    Param,
}

/// A SQL fragment plus its ordered bound parameter values.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Statement {
    parts: Vec<Part>,
    params: Vec<Arc<dyn ToSql + Send + Sync>>,
}

impl Statement {
    /// Create a new statement with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Raw(initial_sql.into())],
            params: Vec::new(),
        }
    }

    /// Create an empty statement.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(Part::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(Part::Raw(sql.to_string())),
        }
        self
    }

    /// Append a placeholder and bind its value in one step.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: ToSql + Send + Sync + 'static,
    {
        self.push_bind_value(Arc::new(value))
    }

    /// Append a placeholder and bind an already-erased value.
    pub fn push_bind_value(&mut self, value: Arc<dyn ToSql + Send + Sync>) -> &mut Self {
        self.parts.push(Part::Param);
        self.params.push(value);
        self
    }

    /// Append another statement, consuming it. Its parameters keep their
    /// relative order and land after everything already bound here.
    pub fn push_statement(&mut self, other: Statement) -> &mut Self {
        for part in other.parts {
            match part {
                Part::Raw(s) => {
                    self.push(&s);
                }
                Part::Param => self.parts.push(Part::Param),
            }
        }
        self.params.extend(other.params);
        self
    }

    /// Whether this statement has neither text nor parameters.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.params.is_empty()
    }

    /// Render the portable template with `?` placeholders.
    pub fn sql(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Raw(s) => out.push_str(s),
                Part::Param => out.push('?'),
            }
        }
        out
    }

    /// Render SQL with `$1, $2, ...` placeholders for execution.
    pub fn to_pg_sql(&self) -> String {
        let mut out = String::new();
        let mut idx = 0usize;
        for part in &self.parts {
            match part {
                Part::Raw(s) => out.push_str(s),
                Part::Param => {
                    idx += 1;
                    out.push('$');
                    out.push_str(&idx.to_string());
                }
            }
        }
        out
    }

    /// The bound parameter values, in placeholder order.
    pub fn params(&self) -> &[Arc<dyn ToSql + Send + Sync>] {
        &self.params
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }

    /// Execute the statement and return all rows.
    pub async fn query(&self, client: &impl GenericClient) -> MetaResult<Vec<Row>> {
        let sql = self.to_pg_sql();
        client.query(&sql, &self.params_ref()).await
    }

    /// Execute the statement and return the first row.
    pub async fn query_one(&self, client: &impl GenericClient) -> MetaResult<Row> {
        let sql = self.to_pg_sql();
        client.query_one(&sql, &self.params_ref()).await
    }

    /// Execute the statement and return the first row, if any.
    pub async fn query_opt(&self, client: &impl GenericClient) -> MetaResult<Option<Row>> {
        let sql = self.to_pg_sql();
        client.query_opt(&sql, &self.params_ref()).await
    }

    /// Execute the statement and return the number of affected rows.
    pub async fn execute(&self, client: &impl GenericClient) -> MetaResult<u64> {
        let sql = self.to_pg_sql();
        client.execute(&sql, &self.params_ref()).await
    }
}
