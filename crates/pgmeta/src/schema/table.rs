//! Schema metadata model: tables, columns, keys, and indexes.
//!
//! These types are a database-agnostic description of what the catalogs
//! report. Keys and indexes reference columns **by name**; cross-table
//! links (foreign-key targets) resolve by name against the owning
//! [`Database`](super::Database) registry rather than through shared
//! pointers.

use serde::{Deserialize, Serialize};
use tokio_postgres::types::Oid;

use super::types::LogicalType;

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Portable logical type.
    pub logical: LogicalType,

    /// Native type name as reported by the catalog.
    pub native_type: String,

    /// Declared length, where the type carries one.
    pub size: Option<i32>,

    /// Numeric precision (same as `size` for this model).
    pub precision: Option<i32>,

    /// Numeric scale.
    pub scale: Option<i32>,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Normalized default expression text. Never populated together with
    /// `autoincrement`.
    pub default: Option<String>,

    /// Whether the default is a sequence-generator call.
    pub autoincrement: bool,

    /// Owning table, by name.
    pub table: String,
}

/// Referential action of a foreign-key constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    Cascade,
    SetDefault,
    SetNull,
    Restrict,
    None,
}

impl FkAction {
    /// Map a single-letter catalog action code. Unrecognized or absent
    /// codes mean NO ACTION, the PostgreSQL default.
    pub fn from_code(code: char) -> Self {
        match code {
            'c' => Self::Cascade,
            'd' => Self::SetDefault,
            'n' => Self::SetNull,
            'r' => Self::Restrict,
            _ => Self::None,
        }
    }
}

/// One local/foreign column pair of a foreign key, linked by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FkReference {
    pub local_column: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

/// Foreign-key metadata. All reference pairs of one constraint share the
/// same action pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub references: Vec<FkReference>,
    pub on_update: FkAction,
    pub on_delete: FkAction,
}

/// Index metadata. Column order is the catalog key-column order, which is
/// semantically significant for composite indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Primary-key metadata, named after its first column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: String,
    pub columns: Vec<String>,
}

/// Table metadata with four independently lazy-loaded groups.
///
/// The loaders live on [`Database`](super::Database); this type exposes the
/// already-loaded data. Each group keeps its own flag so a loader can tell
/// "loaded and empty" apart from "never loaded".
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    oid: Oid,
    columns: Vec<Column>,
    primary_key: Option<PrimaryKey>,
    foreign_keys: Vec<ForeignKey>,
    indexes: Vec<Index>,
    cols_loaded: bool,
    fks_loaded: bool,
    indexes_loaded: bool,
    pk_loaded: bool,
}

impl Table {
    pub(crate) fn new(name: String, oid: Oid) -> Self {
        Self {
            name,
            oid,
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            cols_loaded: false,
            fks_loaded: false,
            indexes_loaded: false,
            pk_loaded: false,
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Catalog object identifier.
    pub fn oid(&self) -> Oid {
        self.oid
    }

    /// Loaded columns, in catalog attribute order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a loaded column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The loaded primary key, if the table has one.
    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    /// Loaded foreign keys.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Loaded indexes.
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn columns_loaded(&self) -> bool {
        self.cols_loaded
    }

    pub fn foreign_keys_loaded(&self) -> bool {
        self.fks_loaded
    }

    pub fn indexes_loaded(&self) -> bool {
        self.indexes_loaded
    }

    pub fn primary_key_loaded(&self) -> bool {
        self.pk_loaded
    }

    pub(crate) fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
        self.cols_loaded = true;
    }

    pub(crate) fn set_foreign_keys(&mut self, fks: Vec<ForeignKey>) {
        self.foreign_keys = fks;
        self.fks_loaded = true;
    }

    pub(crate) fn set_indexes(&mut self, indexes: Vec<Index>) {
        self.indexes = indexes;
        self.indexes_loaded = true;
    }

    pub(crate) fn set_primary_key(&mut self, pk: Option<PrimaryKey>) {
        self.primary_key = pk;
        self.pk_loaded = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_map_to_actions() {
        assert_eq!(FkAction::from_code('c'), FkAction::Cascade);
        assert_eq!(FkAction::from_code('d'), FkAction::SetDefault);
        assert_eq!(FkAction::from_code('n'), FkAction::SetNull);
        assert_eq!(FkAction::from_code('r'), FkAction::Restrict);
        assert_eq!(FkAction::from_code('a'), FkAction::None);
        assert_eq!(FkAction::from_code('?'), FkAction::None);
        assert_eq!(FkAction::from_code('\0'), FkAction::None);
    }

    #[test]
    fn fresh_table_reports_nothing_loaded() {
        let t = Table::new("users".into(), 16_384);
        assert!(!t.columns_loaded());
        assert!(!t.foreign_keys_loaded());
        assert!(!t.indexes_loaded());
        assert!(!t.primary_key_loaded());
        assert!(t.columns().is_empty());
        assert!(t.primary_key().is_none());
    }

    #[test]
    fn column_lookup_preserves_insertion_order() {
        let mut t = Table::new("users".into(), 16_384);
        let col = |name: &str| Column {
            name: name.into(),
            logical: LogicalType::Integer,
            native_type: "int4".into(),
            size: None,
            precision: None,
            scale: None,
            nullable: true,
            default: None,
            autoincrement: false,
            table: "users".into(),
        };
        t.set_columns(vec![col("b"), col("a"), col("c")]);
        assert!(t.columns_loaded());
        let names: Vec<_> = t.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "c"]);
        assert!(t.column("a").is_some());
        assert!(t.column("missing").is_none());
    }

    #[test]
    fn loaded_empty_groups_differ_from_unloaded() {
        let mut t = Table::new("users".into(), 16_384);
        t.set_foreign_keys(Vec::new());
        t.set_primary_key(None);
        assert!(t.foreign_keys_loaded());
        assert!(t.primary_key_loaded());
        assert!(t.foreign_keys().is_empty());
        assert!(t.primary_key().is_none());
    }

    #[test]
    fn metadata_serializes() {
        let pk = PrimaryKey {
            name: "id".into(),
            columns: vec!["id".into(), "region".into()],
        };
        let json = serde_json::to_value(&pk).unwrap();
        assert_eq!(json["columns"][1], "region");

        let fk = ForeignKey {
            name: "orders_user_id_fkey".into(),
            references: vec![FkReference {
                local_column: "user_id".into(),
                foreign_table: "users".into(),
                foreign_column: "id".into(),
            }],
            on_update: FkAction::None,
            on_delete: FkAction::Cascade,
        };
        let json = serde_json::to_value(&fk).unwrap();
        assert_eq!(json["on_delete"], "cascade");
    }
}
