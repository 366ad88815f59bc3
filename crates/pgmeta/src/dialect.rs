//! Per-engine SQL generation policies (Strategy pattern).
//!
//! A [`Dialect`] is a stateless policy object: every method returns a SQL
//! text fragment (no parameters) or appends one in place. The condition and
//! select layers consume it whenever engine-specific SQL must be emitted.

use crate::client::GenericClient;
use crate::error::{MetaError, MetaResult};
use crate::ident::IntoIdent;
use chrono::{DateTime, FixedOffset};

/// SQL syntax strategy for a database engine.
pub trait Dialect: Send + Sync {
    /// The dialect identifier (e.g. "postgres").
    fn name(&self) -> &str;

    /// Wrap an expression for case-insensitive comparison or sort.
    fn ignore_case(&self, expr: &str) -> String;

    /// Wrap an expression in an upper-case fold.
    fn upper(&self, expr: &str) -> String;

    /// SQL which concatenates the second string to the first.
    fn concat(&self, left: &str, right: &str) -> String;

    /// SQL which extracts a substring, 1-based start, optional length.
    fn substring(&self, expr: &str, pos: i64, len: Option<i64>) -> String;

    /// SQL which calculates the length (in chars) of a string.
    fn str_length(&self, expr: &str) -> String;

    /// Append a pagination clause in place: limit then offset, each only
    /// when positive.
    fn apply_limit(&self, sql: &mut String, limit: i64, offset: i64);

    /// A random-ordering expression.
    fn random(&self) -> String;

    /// `chrono` format string for timestamps.
    fn timestamp_format(&self) -> &'static str;

    /// `chrono` format string for times of day.
    fn time_format(&self) -> &'static str;

    /// Format a timestamp the way this engine expects it.
    fn format_timestamp(&self, ts: &DateTime<FixedOffset>) -> String {
        ts.format(self.timestamp_format()).to_string()
    }

    /// Format a time of day the way this engine expects it.
    fn format_time(&self, ts: &DateTime<FixedOffset>) -> String {
        ts.format(self.time_format()).to_string()
    }

    /// Fetch the next value of a sequence, for primary-key generation
    /// before an insert. Fails when no sequence name is supplied.
    fn next_id(
        &self,
        client: &impl GenericClient,
        sequence: Option<&str>,
    ) -> impl std::future::Future<Output = MetaResult<i64>> + Send;
}

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn ignore_case(&self, expr: &str) -> String {
        self.upper(expr)
    }

    fn upper(&self, expr: &str) -> String {
        format!("UPPER({expr})")
    }

    fn concat(&self, left: &str, right: &str) -> String {
        format!("({left} || {right})")
    }

    fn substring(&self, expr: &str, pos: i64, len: Option<i64>) -> String {
        match len {
            Some(len) => format!("substring({expr} from {pos} for {len})"),
            None => format!("substring({expr} from {pos})"),
        }
    }

    fn str_length(&self, expr: &str) -> String {
        format!("char_length({expr})")
    }

    fn apply_limit(&self, sql: &mut String, limit: i64, offset: i64) {
        if limit > 0 {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if offset > 0 {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    fn random(&self) -> String {
        "random()".to_string()
    }

    fn timestamp_format(&self) -> &'static str {
        "%Y-%m-%d %H:%M:%S %z"
    }

    fn time_format(&self) -> &'static str {
        "%H:%M:%S %z"
    }

    async fn next_id(
        &self,
        client: &impl GenericClient,
        sequence: Option<&str>,
    ) -> MetaResult<i64> {
        let Some(sequence) = sequence else {
            return Err(MetaError::unresolved(
                "Unable to fetch next sequence ID without sequence name",
            ));
        };
        let sequence = sequence.into_ident()?;
        let sql = format!("SELECT nextval('{}')", sequence.to_sql());
        let row = client.query_one(&sql, &[]).await?;
        row.try_get::<_, i64>(0)
            .map_err(|e| MetaError::decode("nextval", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_wraps_expression() {
        let d = PostgresDialect;
        assert_eq!(d.upper("name"), "UPPER(name)");
        assert_eq!(d.ignore_case("name"), "UPPER(name)");
    }

    #[test]
    fn concat_uses_pipe_operator() {
        let d = PostgresDialect;
        assert_eq!(d.concat("a", "b"), "(a || b)");
    }

    #[test]
    fn substring_emits_optional_length() {
        let d = PostgresDialect;
        assert_eq!(d.substring("name", 2, Some(3)), "substring(name from 2 for 3)");
        assert_eq!(d.substring("name", 2, None), "substring(name from 2)");
    }

    #[test]
    fn str_length_uses_char_length() {
        let d = PostgresDialect;
        assert_eq!(d.str_length("name"), "char_length(name)");
    }

    #[test]
    fn limit_and_offset_append_only_when_positive() {
        let d = PostgresDialect;

        let mut sql = String::from("SELECT 1");
        d.apply_limit(&mut sql, 0, 0);
        assert_eq!(sql, "SELECT 1");

        let mut sql = String::from("SELECT 1");
        d.apply_limit(&mut sql, 10, 0);
        assert_eq!(sql, "SELECT 1 LIMIT 10");

        let mut sql = String::from("SELECT 1");
        d.apply_limit(&mut sql, 0, 20);
        assert_eq!(sql, "SELECT 1 OFFSET 20");

        let mut sql = String::from("SELECT 1");
        d.apply_limit(&mut sql, 10, 20);
        assert_eq!(sql, "SELECT 1 LIMIT 10 OFFSET 20");
    }

    #[test]
    fn random_expression() {
        assert_eq!(PostgresDialect.random(), "random()");
    }

    #[test]
    fn timestamp_formatting() {
        let d = PostgresDialect;
        let ts = DateTime::parse_from_rfc3339("2009-02-13T23:31:30+00:00").unwrap();
        assert_eq!(d.format_timestamp(&ts), "2009-02-13 23:31:30 +0000");
        assert_eq!(d.format_time(&ts), "23:31:30 +0000");
    }
}
