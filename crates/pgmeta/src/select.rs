//! Minimal SELECT builder.
//!
//! [`Select`] exists so conditions can nest sub-selects
//! (`WHERE x IN (SELECT ...)`) and so the dialect's pagination policy has a
//! consumer. It is deliberately small: table, column list, DISTINCT, a
//! WHERE [`Condition`], ORDER BY, LIMIT/OFFSET. It is not a query language.

use crate::condition::Condition;
use crate::dialect::{Dialect, PostgresDialect};
use crate::error::{MetaError, MetaResult};
use crate::ident::{Ident, IntoIdent};
use crate::statement::Statement;

/// A SELECT query under construction.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Select {
    pub(crate) table: Option<Ident>,
    columns: Vec<String>,
    distinct: bool,
    cond: Condition,
    order_by: Vec<String>,
    pub(crate) limit: Option<i64>,
    offset: Option<i64>,
}

impl Select {
    /// Create a table-less SELECT. A table must be set with
    /// [`Select::from`] before the query can render or nest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a SELECT over the given table.
    pub fn from(table: impl IntoIdent) -> MetaResult<Self> {
        Ok(Self {
            table: Some(table.into_ident()?),
            ..Self::default()
        })
    }

    /// The FROM table, if one has been set.
    pub fn table(&self) -> Option<&Ident> {
        self.table.as_ref()
    }

    /// Replace the column list (defaults to `*`).
    pub fn columns<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.columns = cols.into_iter().map(Into::into).collect();
        self
    }

    /// Append one column expression.
    pub fn column(mut self, col: impl Into<String>) -> Self {
        self.columns.push(col.into());
        self
    }

    /// SELECT DISTINCT.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Replace the WHERE condition.
    pub fn filter(mut self, cond: Condition) -> Self {
        self.cond = cond;
        self
    }

    /// Mutable access to the WHERE condition for incremental building.
    pub fn condition_mut(&mut self) -> &mut Condition {
        &mut self.cond
    }

    /// Append an ORDER BY expression.
    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.order_by.push(expr.into());
        self
    }

    /// Set the row limit.
    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Set the row offset.
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Render the query with the PostgreSQL dialect.
    pub fn statement(&self) -> MetaResult<Statement> {
        self.statement_with(&PostgresDialect)
    }

    /// Render the query with an explicit dialect.
    pub fn statement_with(&self, dialect: &impl Dialect) -> MetaResult<Statement> {
        let Some(table) = &self.table else {
            return Err(MetaError::unresolved("SELECT has no table"));
        };

        let mut stmt = Statement::new("SELECT ");
        if self.distinct {
            stmt.push("DISTINCT ");
        }
        if self.columns.is_empty() {
            stmt.push("*");
        } else {
            stmt.push(&self.columns.join(", "));
        }
        stmt.push(" FROM ");
        stmt.push(&table.to_sql());

        if let Some(clause) = self.cond.clause() {
            stmt.push(" WHERE");
            stmt.push_statement(clause);
        }

        if !self.order_by.is_empty() {
            stmt.push(" ORDER BY ");
            stmt.push(&self.order_by.join(", "));
        }

        let mut tail = String::new();
        dialect.apply_limit(&mut tail, self.limit.unwrap_or(0), self.offset.unwrap_or(0));
        stmt.push(&tail);

        Ok(stmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Op, Quote, Rhs};

    #[test]
    fn renders_star_by_default() {
        let q = Select::from("users").unwrap();
        assert_eq!(q.statement().unwrap().sql(), "SELECT * FROM users");
    }

    #[test]
    fn renders_columns_distinct_order_and_pagination() {
        let q = Select::from("public.users")
            .unwrap()
            .columns(["id", "name"])
            .distinct()
            .order_by("name DESC")
            .limit(10)
            .offset(20);
        assert_eq!(
            q.statement().unwrap().sql(),
            "SELECT DISTINCT id, name FROM public.users ORDER BY name DESC LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn where_clause_binds_params() {
        let mut cond = Condition::new();
        cond.add_and("status", Rhs::value("active")).unwrap();
        let q = Select::from("users").unwrap().filter(cond);
        let stmt = q.statement().unwrap();
        assert_eq!(stmt.sql(), "SELECT * FROM users WHERE status = ? ");
        assert_eq!(stmt.to_pg_sql(), "SELECT * FROM users WHERE status = $1 ");
        assert_eq!(stmt.params().len(), 1);
    }

    #[test]
    fn tableless_select_does_not_render() {
        let q = Select::new();
        assert!(q.statement().is_err());
    }

    #[test]
    fn single_row_subquery_stays_scalar() {
        let sub = Select::from("orders")
            .unwrap()
            .columns(["id"])
            .limit(1);
        let mut c = Condition::new();
        c.add_and("last_order", Rhs::select(sub)).unwrap();
        let stmt = c.clause().unwrap();
        assert_eq!(
            stmt.sql().trim(),
            "last_order = (SELECT id FROM orders LIMIT 1)"
        );
    }

    #[test]
    fn multi_row_subquery_becomes_in() {
        let mut sub_cond = Condition::new();
        sub_cond.add_and("total", Rhs::value(100_i64)).unwrap();
        let sub = Select::from("orders")
            .unwrap()
            .columns(["user_id"])
            .filter(sub_cond);

        let mut c = Condition::new();
        c.add_and("id", Rhs::select(sub)).unwrap();
        let stmt = c.clause().unwrap();
        assert_eq!(
            stmt.sql().trim(),
            "id IN (SELECT user_id FROM orders WHERE total = ? )"
        );
        assert_eq!(stmt.params().len(), 1);
    }

    #[test]
    fn multi_row_subquery_with_not_equal_becomes_not_in() {
        let sub = Select::from("banned").unwrap().columns(["user_id"]);
        let mut c = Condition::new();
        c.add_and_with("id", Rhs::select(sub), Op::NotEqual, Quote::Right)
            .unwrap();
        assert_eq!(
            c.clause().unwrap().sql().trim(),
            "id NOT IN (SELECT user_id FROM banned)"
        );
    }

    #[test]
    fn tableless_subquery_cannot_nest() {
        let mut c = Condition::new();
        let err = c.add_and("id", Rhs::select(Select::new())).unwrap_err();
        assert!(matches!(err, crate::MetaError::UnresolvedReference(_)));
    }

    #[test]
    fn subquery_params_follow_surrounding_params() {
        let mut sub_cond = Condition::new();
        sub_cond.add_and("kind", Rhs::value("sale")).unwrap();
        let sub = Select::from("orders")
            .unwrap()
            .columns(["user_id"])
            .filter(sub_cond);

        let mut c = Condition::new();
        c.add_and("region", Rhs::value("eu")).unwrap();
        c.add_and("id", Rhs::select(sub)).unwrap();
        let stmt = c.clause().unwrap();
        assert_eq!(
            stmt.to_pg_sql(),
            " region = $1 AND id IN (SELECT user_id FROM orders WHERE kind = $2 ) "
        );
    }
}
