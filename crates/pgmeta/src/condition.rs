//! Composable AND/OR condition trees.
//!
//! A [`Condition`] accumulates normalized clauses into two groups
//! (and-clauses, or-clauses) and resolves them on demand into a single
//! [`Statement`]. Each clause is normalized on entry: arrays rewrite
//! equality operators to `IN`/`NOT IN`, `NULL` operands rewrite to the
//! `IS NULL` family, `BETWEEN` binds both bounds, and nested conditions or
//! sub-selects are absorbed as parenthesized fragments with their
//! parameters kept in position.
//!
//! # Example
//! ```ignore
//! use pgmeta::{Condition, Op, Quote, Rhs};
//!
//! let mut c = Condition::new();
//! c.add_and("status", Rhs::value("active"))?
//!     .add_or("id", Rhs::list(vec![1_i64, 2, 3]))?;
//! let stmt = c.clause().expect("non-empty");
//! assert_eq!(stmt.sql(), " status = ?  OR  id IN (?,?,?) ");
//! ```

use crate::error::{MetaError, MetaResult};
use crate::select::Select;
use crate::statement::Statement;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// Comparison operator for building conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `=`
    Equal,
    /// `<>`
    NotEqual,
    /// `!=` (alternate not-equal spelling)
    AltNotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessEqual,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `ILIKE` (case-insensitive, PostgreSQL)
    Ilike,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `BETWEEN`
    Between,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

impl Op {
    /// The SQL spelling of this operator.
    pub fn as_sql(self) -> &'static str {
        match self {
            Op::Equal => "=",
            Op::NotEqual => "<>",
            Op::AltNotEqual => "!=",
            Op::GreaterThan => ">",
            Op::GreaterEqual => ">=",
            Op::LessThan => "<",
            Op::LessEqual => "<=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::Ilike => "ILIKE",
            Op::In => "IN",
            Op::NotIn => "NOT IN",
            Op::Between => "BETWEEN",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
        }
    }
}

/// Which side(s) of a clause are bound as parameters.
///
/// The right side is the common case. Left quoting binds the left operand
/// itself (a dynamic column name used as a value); `None` treats both sides
/// as raw SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Left,
    Right,
    Both,
    None,
}

/// Left operand of a clause: a column expression, or a whole nested
/// condition that resolves to a parenthesized sub-clause.
#[derive(Debug, Clone)]
pub enum Lhs {
    Column(String),
    Nested(Box<Condition>),
}

impl From<&str> for Lhs {
    fn from(s: &str) -> Self {
        Lhs::Column(s.to_string())
    }
}

impl From<String> for Lhs {
    fn from(s: String) -> Self {
        Lhs::Column(s)
    }
}

impl From<Condition> for Lhs {
    fn from(c: Condition) -> Self {
        Lhs::Nested(Box::new(c))
    }
}

impl From<&Condition> for Lhs {
    fn from(c: &Condition) -> Self {
        Lhs::Nested(Box::new(c.clone()))
    }
}

/// Right operand of a clause.
#[derive(Debug, Clone)]
pub enum Rhs {
    /// A single typed value, bound as a parameter when right-quoted.
    Value(Arc<dyn ToSql + Send + Sync>),
    /// Multiple values; rewrites the operator to `IN`/`NOT IN`.
    List(Vec<Arc<dyn ToSql + Send + Sync>>),
    /// SQL `NULL`; rewrites equality operators to the `IS NULL` family.
    Null,
    /// Raw SQL text (e.g. another column name). Bound as a text parameter
    /// when right-quoted, inlined verbatim otherwise.
    Raw(String),
    /// A sub-select. Must have a table; a cardinality other than exactly
    /// one row makes it behave like an array operand.
    Subquery(Box<Select>),
}

impl Rhs {
    /// A single bindable value.
    pub fn value<T>(v: T) -> Self
    where
        T: ToSql + Send + Sync + 'static,
    {
        Rhs::Value(Arc::new(v))
    }

    /// A list of bindable values.
    pub fn list<T>(vals: impl IntoIterator<Item = T>) -> Self
    where
        T: ToSql + Send + Sync + 'static,
    {
        Rhs::List(
            vals.into_iter()
                .map(|v| Arc::new(v) as Arc<dyn ToSql + Send + Sync>)
                .collect(),
        )
    }

    /// SQL `NULL`.
    pub fn null() -> Self {
        Rhs::Null
    }

    /// Raw SQL text, never validated. Prefer [`Rhs::value`] for data.
    pub fn raw(sql: impl Into<String>) -> Self {
        Rhs::Raw(sql.into())
    }

    /// A nested sub-select.
    pub fn select(query: Select) -> Self {
        Rhs::Subquery(Box::new(query))
    }
}

/// Internal shape of the right operand once sub-selects are resolved.
enum Resolved {
    Value(Arc<dyn ToSql + Send + Sync>),
    List(Vec<Arc<dyn ToSql + Send + Sync>>),
    Null,
    Raw(String),
    Fragment(Statement),
}

/// An AND/OR tree of normalized clauses.
///
/// Built incrementally via the `add_*` methods; resolved (idempotently) by
/// [`Condition::clause`]. Resolution joins the and-group with `" AND "`,
/// the or-group with `" OR "`, and, when both groups are present, the two
/// groups with `" OR "`: a flat OR between the conjunction and the
/// disjunction, not per-item placement.
#[derive(Debug, Clone, Default)]
pub struct Condition {
    ands: Vec<Statement>,
    ors: Vec<Statement>,
}

impl Condition {
    /// Create an empty condition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias of [`Condition::add_and`].
    pub fn add(&mut self, left: impl Into<Lhs>, rhs: Rhs) -> MetaResult<&mut Self> {
        self.add_and(left, rhs)
    }

    /// Add an AND clause with the default operator (`=`) and right quoting.
    pub fn add_and(&mut self, left: impl Into<Lhs>, rhs: Rhs) -> MetaResult<&mut Self> {
        self.add_and_with(left, rhs, Op::Equal, Quote::Right)
    }

    /// Add an OR clause with the default operator (`=`) and right quoting.
    pub fn add_or(&mut self, left: impl Into<Lhs>, rhs: Rhs) -> MetaResult<&mut Self> {
        self.add_or_with(left, rhs, Op::Equal, Quote::Right)
    }

    /// Add an AND clause with an explicit operator and quoting mode.
    pub fn add_and_with(
        &mut self,
        left: impl Into<Lhs>,
        rhs: Rhs,
        op: Op,
        quote: Quote,
    ) -> MetaResult<&mut Self> {
        if let Some(stmt) = process(left.into(), rhs, op, quote)? {
            self.ands.push(stmt);
        }
        Ok(self)
    }

    /// Add an OR clause with an explicit operator and quoting mode.
    pub fn add_or_with(
        &mut self,
        left: impl Into<Lhs>,
        rhs: Rhs,
        op: Op,
        quote: Quote,
    ) -> MetaResult<&mut Self> {
        if let Some(stmt) = process(left.into(), rhs, op, quote)? {
            self.ors.push(stmt);
        }
        Ok(self)
    }

    /// Expand column/value pairs, each into its own AND clause.
    pub fn and_all<S: Into<String>>(
        &mut self,
        pairs: impl IntoIterator<Item = (S, Rhs)>,
    ) -> MetaResult<&mut Self> {
        for (column, rhs) in pairs {
            self.add_and(Lhs::Column(column.into()), rhs)?;
        }
        Ok(self)
    }

    /// Expand column/value pairs, each into its own OR clause.
    pub fn or_any<S: Into<String>>(
        &mut self,
        pairs: impl IntoIterator<Item = (S, Rhs)>,
    ) -> MetaResult<&mut Self> {
        for (column, rhs) in pairs {
            self.add_or(Lhs::Column(column.into()), rhs)?;
        }
        Ok(self)
    }

    /// Whether no clauses have been added.
    pub fn is_empty(&self) -> bool {
        self.ands.is_empty() && self.ors.is_empty()
    }

    /// Resolve the condition into a single statement.
    ///
    /// Returns `None` (absence of a condition, as opposed to an empty
    /// string) when no clauses were added. Parameters are collected
    /// and-group first, then or-group, each in clause-addition order.
    pub fn clause(&self) -> Option<Statement> {
        self.render(true)
    }

    fn render(&self, wrapped: bool) -> Option<Statement> {
        if self.is_empty() {
            return None;
        }
        let mut out = Statement::empty();
        if !self.ands.is_empty() {
            if wrapped {
                out.push(" ");
            }
            for (i, s) in self.ands.iter().enumerate() {
                if i > 0 {
                    out.push(" AND ");
                }
                out.push_statement(s.clone());
            }
            if wrapped {
                out.push(" ");
            }
        }
        if !self.ands.is_empty() && !self.ors.is_empty() {
            out.push(" OR ");
        }
        if !self.ors.is_empty() {
            if wrapped {
                out.push(" ");
            }
            for (i, s) in self.ors.iter().enumerate() {
                if i > 0 {
                    out.push(" OR ");
                }
                out.push_statement(s.clone());
            }
            if wrapped {
                out.push(" ");
            }
        }
        Some(out)
    }
}

/// Normalize one clause into a statement, or nothing when the clause
/// imposes no restriction.
fn process(left: Lhs, rhs: Rhs, op: Op, quote: Quote) -> MetaResult<Option<Statement>> {
    // A nested condition resolves to its parenthesized clause verbatim.
    let column = match left {
        Lhs::Nested(inner) => {
            return Ok(inner.render(false).map(|c| {
                let mut s = Statement::empty();
                s.push("(");
                s.push_statement(c);
                s.push(")");
                s
            }));
        }
        Lhs::Column(c) => c,
    };

    let mut op = op;
    let mut quote = quote;

    // A sub-select whose cardinality is anything but exactly one row
    // behaves like an array operand.
    let is_array = match &rhs {
        Rhs::List(_) => true,
        Rhs::Subquery(q) => q.limit != Some(1),
        _ => false,
    };

    let right = match rhs {
        Rhs::Subquery(q) => {
            if q.table.is_none() {
                return Err(MetaError::unresolved(
                    "sub-select has no table and cannot be nested",
                ));
            }
            let mut frag = Statement::empty();
            frag.push("(");
            frag.push_statement(q.statement()?);
            frag.push(")");
            // The fragment is already SQL; only an explicit left-quote request survives.
            if quote != Quote::Left {
                quote = Quote::None;
            }
            Resolved::Fragment(frag)
        }
        Rhs::Value(v) => Resolved::Value(v),
        Rhs::List(vs) => Resolved::List(vs),
        Rhs::Null => Resolved::Null,
        Rhs::Raw(s) => Resolved::Raw(s),
    };

    let mut stmt = Statement::empty();

    if is_array {
        // BETWEEN over exactly two values, independent of quoting mode.
        if op == Op::Between {
            if let Resolved::List(vs) = &right {
                if vs.len() == 2 {
                    emit_left(&mut stmt, &column, quote);
                    stmt.push(" BETWEEN ");
                    stmt.push_bind_value(vs[0].clone());
                    stmt.push(" AND ");
                    stmt.push_bind_value(vs[1].clone());
                    return Ok(Some(stmt));
                }
            }
        }

        op = match op {
            Op::In | Op::Equal => Op::In,
            Op::NotIn | Op::NotEqual | Op::AltNotEqual => Op::NotIn,
            other => {
                return Err(MetaError::invalid_usage(format!(
                    "operator '{}' cannot compare an array operand",
                    other.as_sql()
                )));
            }
        };

        match right {
            Resolved::List(vs) if vs.is_empty() => {
                // IN () can never match; NOT IN () restricts nothing.
                return Ok(if op == Op::In {
                    Some(Statement::new("0"))
                } else {
                    None
                });
            }
            Resolved::List(vs) => {
                if !matches!(quote, Quote::Right | Quote::Both) {
                    return Err(MetaError::invalid_usage(
                        "an array operand requires right-side quoting",
                    ));
                }
                emit_left(&mut stmt, &column, quote);
                stmt.push(" ");
                stmt.push(op.as_sql());
                stmt.push(" (");
                for (i, v) in vs.into_iter().enumerate() {
                    if i > 0 {
                        stmt.push(",");
                    }
                    stmt.push_bind_value(v);
                }
                stmt.push(")");
                return Ok(Some(stmt));
            }
            Resolved::Fragment(frag) => {
                emit_left(&mut stmt, &column, quote);
                stmt.push(" ");
                stmt.push(op.as_sql());
                stmt.push(" ");
                stmt.push_statement(frag);
                return Ok(Some(stmt));
            }
            // is_array is only set for lists and sub-selects
            _ => unreachable!("array operand is a list or sub-select"),
        }
    }

    // NULL operands rewrite equality operators to the IS NULL family.
    if matches!(right, Resolved::Null) {
        match op {
            Op::NotEqual | Op::AltNotEqual => op = Op::IsNotNull,
            Op::Equal => op = Op::IsNull,
            _ => {}
        }
    }

    // The IS NULL family drops the right operand entirely.
    if matches!(op, Op::IsNull | Op::IsNotNull) {
        emit_left(&mut stmt, &column, quote);
        stmt.push(" ");
        stmt.push(op.as_sql());
        return Ok(Some(stmt));
    }

    emit_left(&mut stmt, &column, quote);
    stmt.push(" ");
    stmt.push(op.as_sql());
    stmt.push(" ");
    match right {
        Resolved::Value(v) => {
            if matches!(quote, Quote::Right | Quote::Both) {
                stmt.push_bind_value(v);
            } else {
                return Err(MetaError::invalid_usage(
                    "a typed value cannot be inlined unquoted; use Rhs::raw for raw SQL text",
                ));
            }
        }
        Resolved::Raw(s) => {
            if matches!(quote, Quote::Right | Quote::Both) {
                stmt.push_bind(s);
            } else {
                stmt.push(&s);
            }
        }
        Resolved::Null => {
            // NULL with a non-equality operator still occupies the right side.
            if matches!(quote, Quote::Right | Quote::Both) {
                stmt.push_bind(Option::<String>::None);
            } else {
                stmt.push("NULL");
            }
        }
        Resolved::Fragment(frag) => {
            stmt.push_statement(frag);
        }
        Resolved::List(_) => unreachable!("lists are handled on the array path"),
    }
    Ok(Some(stmt))
}

fn emit_left(stmt: &mut Statement, column: &str, quote: Quote) {
    if matches!(quote, Quote::Left | Quote::Both) {
        stmt.push_bind(column.to_string());
    } else {
        stmt.push(column);
    }
}
