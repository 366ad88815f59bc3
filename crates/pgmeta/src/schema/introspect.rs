//! Catalog queries and per-row normalization.
//!
//! Fetch functions run one catalog query each and return plain row structs;
//! the normalization functions that turn those rows into metadata are pure
//! so the decoding rules stay unit-testable without a database.

use regex::Regex;
use std::sync::LazyLock;
use tokio_postgres::types::Oid;

use crate::client::GenericClient;
use crate::error::{MetaError, MetaResult};
use crate::row::RowExt;

use super::table::Column;
use super::types::{LogicalType, decode_typmod};

/// A sequence-generator default marks the column autoincrement.
static NEXTVAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^nextval\(").unwrap());

/// Trailing `::type` cast annotation on a default expression.
static TRAILING_CAST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)::.*$").unwrap());

/// One attribute row, as fetched from `pg_attribute`.
#[derive(Debug, Clone)]
pub(crate) struct RawColumn {
    pub name: String,
    pub typmod: i32,
    pub has_default: bool,
    pub not_null: bool,
    pub default_src: Option<String>,
    pub is_array: bool,
    pub type_name: String,
    pub type_kind: char,
}

impl RawColumn {
    /// Whether the attribute's type is a domain rather than a base type.
    pub fn is_domain(&self) -> bool {
        self.type_kind.eq_ignore_ascii_case(&'d')
    }
}

/// Domain attributes resolved from `pg_type`.
#[derive(Debug, Clone)]
pub(crate) struct RawDomain {
    pub base_type: String,
    pub typmod: i32,
    pub not_null: bool,
    pub default: Option<String>,
}

/// One foreign-key reference pair row (one per key-column position).
#[derive(Debug, Clone)]
pub(crate) struct RawForeignKey {
    pub name: String,
    pub on_update: char,
    pub on_delete: char,
    pub foreign_table: String,
    pub local_column: String,
    pub foreign_column: String,
}

/// One non-primary index row with its ordinal column positions.
#[derive(Debug, Clone)]
pub(crate) struct RawIndex {
    pub name: String,
    pub unique: bool,
    pub ordinals: Vec<i16>,
}

/// The effective source attributes of a column once domains are resolved.
#[derive(Debug, Clone)]
pub(crate) struct ColumnSource {
    pub type_name: String,
    pub typmod: i32,
    pub has_default: bool,
    pub default_src: Option<String>,
    pub not_null: bool,
}

pub(crate) fn source_from_base(raw: &RawColumn) -> ColumnSource {
    ColumnSource {
        type_name: raw.type_name.clone(),
        typmod: raw.typmod,
        has_default: raw.has_default,
        default_src: raw.default_src.clone(),
        not_null: raw.not_null,
    }
}

/// Merge a domain's attributes under the column's own: the column wins where
/// it says something, the domain fills the gaps. Length and scale always
/// come from the domain's typmod against its base type.
pub(crate) fn source_from_domain(raw: &RawColumn, domain: RawDomain) -> ColumnSource {
    ColumnSource {
        type_name: domain.base_type,
        typmod: domain.typmod,
        has_default: raw.has_default || domain.default.is_some(),
        default_src: raw
            .default_src
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or(domain.default),
        not_null: raw.not_null || domain.not_null,
    }
}

/// Split a raw default expression into (default text, autoincrement flag).
///
/// `nextval(...)` defaults mark the column autoincrement and clear the
/// text; anything else loses its trailing cast annotation and surrounding
/// quotes. Exactly one of the two results is ever populated.
pub(crate) fn normalize_default(has_default: bool, src: Option<&str>) -> (Option<String>, bool) {
    let Some(src) = src else {
        return (None, false);
    };
    let src = src.trim();
    if !has_default || src.is_empty() {
        return (None, false);
    }
    if NEXTVAL.is_match(src) {
        return (None, true);
    }
    let stripped = TRAILING_CAST.replace(src, "");
    let stripped = stripped.trim();
    let stripped = stripped
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(stripped);
    (Some(stripped.to_string()), false)
}

/// Build a column from a catalog row and its (optionally) resolved domain.
pub(crate) fn column_from_raw(
    table: &str,
    raw: &RawColumn,
    domain: Option<RawDomain>,
) -> MetaResult<Column> {
    if raw.is_array {
        return Err(MetaError::unsupported_column(table, &raw.name));
    }
    let source = match domain {
        Some(d) => source_from_domain(raw, d),
        None => source_from_base(raw),
    };
    let logical = LogicalType::from_native(&source.type_name);
    let (size, scale) = decode_typmod(logical, source.typmod);
    let (default, autoincrement) =
        normalize_default(source.has_default, source.default_src.as_deref());
    Ok(Column {
        name: raw.name.clone(),
        logical,
        native_type: source.type_name,
        size,
        precision: size,
        scale,
        nullable: !source.not_null,
        default,
        autoincrement,
        table: table.to_string(),
    })
}

/// Parse a space-separated catalog ordinal list (`indkey`-style).
pub(crate) fn parse_ordinals(s: &str) -> MetaResult<Vec<i16>> {
    s.split_whitespace()
        .map(|tok| {
            tok.parse::<i16>()
                .map_err(|_| MetaError::decode("indkey", format!("bad ordinal '{tok}'")))
        })
        .collect()
}

/// List the ordinary tables of a namespace with their OIDs.
pub(crate) async fn fetch_tables(
    client: &impl GenericClient,
    schema: &str,
) -> MetaResult<Vec<(String, Oid)>> {
    let rows = client
        .query(
            r#"
            SELECT c.relname, c.oid
            FROM pg_catalog.pg_class c
            JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
            WHERE c.relkind = 'r'
              AND n.nspname = $1
            ORDER BY c.relname
            "#,
            &[&schema],
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok((
                row.try_get_column::<String>("relname")?,
                row.try_get_column::<Oid>("oid")?,
            ))
        })
        .collect()
}

/// Fetch the ordered attribute rows of a table.
pub(crate) async fn fetch_columns(
    client: &impl GenericClient,
    oid: Oid,
) -> MetaResult<Vec<RawColumn>> {
    let rows = client
        .query(
            r#"
            SELECT
                att.attname,
                att.atttypmod,
                att.atthasdef,
                att.attnotnull,
                pg_get_expr(def.adbin, def.adrelid) AS adsrc,
                att.attndims > 0 AS isarray,
                CASE
                    WHEN ty.typname = 'bpchar' THEN 'char'
                    WHEN ty.typname = '_bpchar' THEN '_char'
                    ELSE ty.typname
                END AS typname,
                ty.typtype
            FROM pg_catalog.pg_attribute att
            JOIN pg_catalog.pg_type ty ON ty.oid = att.atttypid
            LEFT JOIN pg_catalog.pg_attrdef def
                ON def.adrelid = att.attrelid AND def.adnum = att.attnum
            WHERE att.attrelid = $1
              AND att.attnum > 0
              AND NOT att.attisdropped
            ORDER BY att.attnum
            "#,
            &[&oid],
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok(RawColumn {
                name: row.try_get_column("attname")?,
                typmod: row.try_get_column("atttypmod")?,
                has_default: row.try_get_column("atthasdef")?,
                not_null: row.try_get_column("attnotnull")?,
                default_src: row.try_get_column::<Option<String>>("adsrc")?,
                is_array: row.try_get_column("isarray")?,
                type_name: row.try_get_column("typname")?,
                // Postgres stores `typtype` as a "char"; the driver exposes it as i8.
                type_kind: row.try_get_column::<i8>("typtype")? as u8 as char,
            })
        })
        .collect()
}

/// Resolve a domain to its base type, typmod, nullability, and default.
pub(crate) async fn resolve_domain(
    client: &impl GenericClient,
    domain: &str,
) -> MetaResult<RawDomain> {
    if domain.trim().is_empty() {
        return Err(MetaError::unresolved(format!(
            "Invalid domain name [{domain}]"
        )));
    }
    let row = client
        .query_opt(
            r#"
            SELECT
                b.typname AS basetype,
                d.typtypmod,
                d.typnotnull,
                d.typdefault
            FROM pg_catalog.pg_type d
            JOIN pg_catalog.pg_type b
                ON b.oid = CASE WHEN d.typndims > 0 THEN d.typelem ELSE d.typbasetype END
            WHERE d.typtype = 'd'
              AND d.typname = $1
            "#,
            &[&domain],
        )
        .await?
        .ok_or_else(|| MetaError::unresolved(format!("Domain [{domain}] not found")))?;

    Ok(RawDomain {
        base_type: row.try_get_column("basetype")?,
        typmod: row.try_get_column("typtypmod")?,
        not_null: row.try_get_column("typnotnull")?,
        default: row.try_get_column::<Option<String>>("typdefault")?,
    })
}

/// Fetch foreign-key reference pairs, one row per key-column position.
pub(crate) async fn fetch_foreign_keys(
    client: &impl GenericClient,
    oid: Oid,
) -> MetaResult<Vec<RawForeignKey>> {
    let rows = client
        .query(
            r#"
            SELECT
                ct.conname,
                ct.confupdtype,
                ct.confdeltype,
                cr.relname AS reftab,
                la.attname AS fkcol,
                ra.attname AS refcol
            FROM pg_catalog.pg_constraint ct
            JOIN pg_catalog.pg_class cr ON cr.oid = ct.confrelid
            CROSS JOIN LATERAL unnest(ct.conkey, ct.confkey)
                WITH ORDINALITY AS k(lattnum, fattnum, ord)
            JOIN pg_catalog.pg_attribute la
                ON la.attrelid = ct.conrelid AND la.attnum = k.lattnum
            JOIN pg_catalog.pg_attribute ra
                ON ra.attrelid = ct.confrelid AND ra.attnum = k.fattnum
            WHERE ct.contype = 'f'
              AND ct.conrelid = $1
            ORDER BY ct.conname, k.ord
            "#,
            &[&oid],
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok(RawForeignKey {
                name: row.try_get_column("conname")?,
                on_update: row.try_get_column::<i8>("confupdtype")? as u8 as char,
                on_delete: row.try_get_column::<i8>("confdeltype")? as u8 as char,
                foreign_table: row.try_get_column("reftab")?,
                local_column: row.try_get_column("fkcol")?,
                foreign_column: row.try_get_column("refcol")?,
            })
        })
        .collect()
}

/// List the non-primary indexes of a table with their key ordinal lists.
pub(crate) async fn fetch_indexes(
    client: &impl GenericClient,
    oid: Oid,
) -> MetaResult<Vec<RawIndex>> {
    let rows = client
        .query(
            r#"
            SELECT DISTINCT ON (cls.relname)
                cls.relname AS idxname,
                idx.indkey::text AS indkey,
                idx.indisunique
            FROM pg_catalog.pg_index idx
            JOIN pg_catalog.pg_class cls ON cls.oid = idx.indexrelid
            WHERE idx.indrelid = $1
              AND NOT idx.indisprimary
            ORDER BY cls.relname
            "#,
            &[&oid],
        )
        .await?;

    rows.iter()
        .map(|row| {
            let indkey: String = row.try_get_column("indkey")?;
            Ok(RawIndex {
                name: row.try_get_column("idxname")?,
                unique: row.try_get_column("indisunique")?,
                ordinals: parse_ordinals(&indkey)?,
            })
        })
        .collect()
}

/// Fetch the ordered primary-key ordinal list, if the table has one.
pub(crate) async fn fetch_primary_key_ordinals(
    client: &impl GenericClient,
    oid: Oid,
) -> MetaResult<Option<Vec<i16>>> {
    let row = client
        .query_opt(
            r#"
            SELECT array_to_string(ct.conkey, ' ') AS conkey
            FROM pg_catalog.pg_constraint ct
            WHERE ct.conrelid = $1
              AND ct.contype = 'p'
            "#,
            &[&oid],
        )
        .await?;

    match row {
        Some(row) => {
            let conkey: String = row.try_get_column("conkey")?;
            Ok(Some(parse_ordinals(&conkey)?))
        }
        None => Ok(None),
    }
}

/// Resolve one catalog ordinal position to its attribute name.
pub(crate) async fn resolve_ordinal(
    client: &impl GenericClient,
    oid: Oid,
    ordinal: i16,
) -> MetaResult<String> {
    let row = client
        .query_opt(
            r#"
            SELECT a.attname
            FROM pg_catalog.pg_attribute a
            WHERE a.attrelid = $1
              AND a.attnum = $2
              AND NOT a.attisdropped
            "#,
            &[&oid, &ordinal],
        )
        .await?
        .ok_or_else(|| MetaError::unresolved(format!("no attribute at ordinal {ordinal}")))?;
    row.try_get_column("attname")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, type_name: &str) -> RawColumn {
        RawColumn {
            name: name.into(),
            typmod: -1,
            has_default: false,
            not_null: false,
            default_src: None,
            is_array: false,
            type_name: type_name.into(),
            type_kind: 'b',
        }
    }

    #[test]
    fn array_column_is_unsupported() {
        let mut r = raw("tags", "_text");
        r.is_array = true;
        let err = column_from_raw("posts", &r, None).unwrap_err();
        assert!(matches!(err, MetaError::UnsupportedColumn { .. }));
        assert!(err.to_string().contains("posts.tags"));
    }

    #[test]
    fn numeric_column_decodes_length_and_scale() {
        let mut r = raw("price", "numeric");
        r.typmod = (12 << 16) + 3 + 4;
        let col = column_from_raw("items", &r, None).unwrap();
        assert_eq!(col.logical, LogicalType::Numeric);
        assert_eq!(col.size, Some(12));
        assert_eq!(col.precision, Some(12));
        assert_eq!(col.scale, Some(3));
    }

    #[test]
    fn modifierless_column_has_no_length_info() {
        let col = column_from_raw("items", &raw("notes", "text"), None).unwrap();
        assert_eq!(col.size, None);
        assert_eq!(col.scale, None);
    }

    #[test]
    fn nullability_is_the_inverse_of_not_null() {
        let mut r = raw("id", "int8");
        r.not_null = true;
        let col = column_from_raw("items", &r, None).unwrap();
        assert!(!col.nullable);

        let col = column_from_raw("items", &raw("note", "text"), None).unwrap();
        assert!(col.nullable);
    }

    #[test]
    fn nextval_default_marks_autoincrement() {
        let mut r = raw("id", "int8");
        r.has_default = true;
        r.default_src = Some("nextval('items_id_seq'::regclass)".into());
        let col = column_from_raw("items", &r, None).unwrap();
        assert!(col.autoincrement);
        assert_eq!(col.default, None);
    }

    #[test]
    fn default_loses_cast_and_quotes() {
        assert_eq!(
            normalize_default(true, Some("'active'::character varying")),
            (Some("active".into()), false)
        );
        assert_eq!(
            normalize_default(true, Some("0")),
            (Some("0".into()), false)
        );
        assert_eq!(
            normalize_default(true, Some("now()")),
            (Some("now()".into()), false)
        );
    }

    #[test]
    fn absent_default_stays_absent() {
        assert_eq!(normalize_default(false, None), (None, false));
        assert_eq!(normalize_default(false, Some("ignored")), (None, false));
        assert_eq!(normalize_default(true, Some("   ")), (None, false));
    }

    #[test]
    fn default_and_autoincrement_never_coexist() {
        for src in [Some("nextval('s')"), Some("'x'::text"), None] {
            let (default, auto) = normalize_default(true, src);
            assert!(!(auto && default.is_some()));
        }
    }

    #[test]
    fn domain_fills_gaps_under_the_column() {
        let mut r = raw("status", "order_status");
        r.type_kind = 'd';
        let dom = RawDomain {
            base_type: "varchar".into(),
            typmod: 20 + 4,
            not_null: true,
            default: Some("'new'::character varying".into()),
        };
        let col = column_from_raw("orders", &r, Some(dom)).unwrap();
        assert_eq!(col.logical, LogicalType::Varchar);
        assert_eq!(col.native_type, "varchar");
        assert_eq!(col.size, Some(20));
        assert!(!col.nullable);
        assert_eq!(col.default, Some("new".into()));
        assert!(!col.autoincrement);
    }

    #[test]
    fn column_default_wins_over_domain_default() {
        let mut r = raw("status", "order_status");
        r.type_kind = 'd';
        r.has_default = true;
        r.default_src = Some("'override'::text".into());
        let dom = RawDomain {
            base_type: "varchar".into(),
            typmod: -1,
            not_null: false,
            default: Some("'domain'::text".into()),
        };
        let col = column_from_raw("orders", &r, Some(dom)).unwrap();
        assert_eq!(col.default, Some("override".into()));
    }

    #[test]
    fn ordinal_lists_parse_in_order() {
        assert_eq!(parse_ordinals("1 3 2").unwrap(), vec![1, 3, 2]);
        assert_eq!(parse_ordinals("").unwrap(), Vec::<i16>::new());
        assert!(parse_ordinals("1 x").is_err());
    }
}
