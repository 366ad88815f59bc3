//! Live-schema metadata registry.
//!
//! [`Database`] owns one [`Table`] per catalog relation and populates the
//! four metadata groups (columns, foreign keys, indexes, primary key)
//! lazily, each behind its own flag, so a group is queried at most once per
//! table for the registry's lifetime. Key and index loading requires the
//! columns first; every loader enforces that order explicitly rather than
//! relying on access side effects.
//!
//! Metadata is never invalidated: discard the registry and build a new one
//! for a fresh view of the schema.
//!
//! # Example
//! ```ignore
//! use pgmeta::Database;
//!
//! let mut db = Database::new("public");
//! db.refresh(&client).await?;
//! let columns = db.columns("users", &client).await?;
//! let pk = db.primary_key("users", &client).await?;
//! ```

mod introspect;
mod table;
mod types;

pub use table::{Column, FkAction, FkReference, ForeignKey, Index, PrimaryKey, Table};
pub use types::{LogicalType, decode_typmod};

use std::collections::BTreeMap;
use tracing::debug;

use crate::client::GenericClient;
use crate::error::{MetaError, MetaResult};

/// A name-keyed registry of table metadata for one namespace.
pub struct Database {
    schema: String,
    tables: BTreeMap<String, Table>,
}

impl Database {
    /// Create an empty registry for a namespace (e.g. `public`).
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            tables: BTreeMap::new(),
        }
    }

    /// The namespace this registry covers.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Discover the namespace's ordinary tables. Replaces any previously
    /// registered tables; loads no metadata groups.
    pub async fn refresh(&mut self, client: &impl GenericClient) -> MetaResult<()> {
        let found = introspect::fetch_tables(client, &self.schema).await?;
        debug!(
            "discovered {} tables in schema '{}'",
            found.len(),
            self.schema
        );
        self.tables = found
            .into_iter()
            .map(|(name, oid)| (name.clone(), Table::new(name, oid)))
            .collect();
        Ok(())
    }

    /// Iterate over the registered tables.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Look up a registered table by name.
    pub fn table(&self, name: &str) -> MetaResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| MetaError::unresolved(format!("Unknown table [{name}]")))
    }

    /// The columns of a table, loading them on first access.
    pub async fn columns(
        &mut self,
        name: &str,
        client: &impl GenericClient,
    ) -> MetaResult<&[Column]> {
        self.ensure_columns(name, client).await?;
        Ok(self.table(name)?.columns())
    }

    /// One column of a table by name, loading columns on first access.
    pub async fn column(
        &mut self,
        table: &str,
        column: &str,
        client: &impl GenericClient,
    ) -> MetaResult<&Column> {
        self.ensure_columns(table, client).await?;
        self.table(table)?
            .column(column)
            .ok_or_else(|| MetaError::unresolved(format!("Unknown column [{table}.{column}]")))
    }

    /// The primary key of a table, loading it on first access.
    pub async fn primary_key(
        &mut self,
        name: &str,
        client: &impl GenericClient,
    ) -> MetaResult<Option<&PrimaryKey>> {
        self.ensure_columns(name, client).await?;
        if !self.table(name)?.primary_key_loaded() {
            self.load_primary_key(name, client).await?;
        }
        Ok(self.table(name)?.primary_key())
    }

    /// The foreign keys of a table, loading them on first access.
    pub async fn foreign_keys(
        &mut self,
        name: &str,
        client: &impl GenericClient,
    ) -> MetaResult<&[ForeignKey]> {
        self.ensure_columns(name, client).await?;
        if !self.table(name)?.foreign_keys_loaded() {
            self.load_foreign_keys(name, client).await?;
        }
        Ok(self.table(name)?.foreign_keys())
    }

    /// The non-primary indexes of a table, loading them on first access.
    pub async fn indexes(
        &mut self,
        name: &str,
        client: &impl GenericClient,
    ) -> MetaResult<&[Index]> {
        self.ensure_columns(name, client).await?;
        if !self.table(name)?.indexes_loaded() {
            self.load_indexes(name, client).await?;
        }
        Ok(self.table(name)?.indexes())
    }

    /// Load columns unless already loaded. Keys and indexes depend on this
    /// having run for the tables they touch.
    async fn ensure_columns(&mut self, name: &str, client: &impl GenericClient) -> MetaResult<()> {
        if self.table(name)?.columns_loaded() {
            return Ok(());
        }
        let oid = self.table(name)?.oid();
        let raws = introspect::fetch_columns(client, oid).await?;
        let mut columns = Vec::with_capacity(raws.len());
        for raw in &raws {
            if raw.is_array {
                return Err(MetaError::unsupported_column(name, &raw.name));
            }
            let domain = if raw.is_domain() {
                Some(introspect::resolve_domain(client, &raw.type_name).await?)
            } else {
                None
            };
            columns.push(introspect::column_from_raw(name, raw, domain)?);
        }
        debug!("loaded {} columns for {}", columns.len(), name);
        let table = self.tables.get_mut(name).expect("table just looked up");
        table.set_columns(columns);
        Ok(())
    }

    async fn load_foreign_keys(
        &mut self,
        name: &str,
        client: &impl GenericClient,
    ) -> MetaResult<()> {
        let oid = self.table(name)?.oid();
        let raws = introspect::fetch_foreign_keys(client, oid).await?;
        let mut fks: Vec<ForeignKey> = Vec::new();
        for raw in raws {
            if self.table(name)?.column(&raw.local_column).is_none() {
                return Err(MetaError::unresolved(format!(
                    "Unknown column [{name}.{}] in foreign key {}",
                    raw.local_column, raw.name
                )));
            }
            // The referenced side resolves by name against this registry,
            // which needs its columns loaded first.
            self.ensure_columns(&raw.foreign_table, client).await?;
            if self
                .table(&raw.foreign_table)?
                .column(&raw.foreign_column)
                .is_none()
            {
                return Err(MetaError::unresolved(format!(
                    "Unknown column [{}.{}] in foreign key {}",
                    raw.foreign_table, raw.foreign_column, raw.name
                )));
            }

            let reference = FkReference {
                local_column: raw.local_column,
                foreign_table: raw.foreign_table,
                foreign_column: raw.foreign_column,
            };
            match fks.iter().position(|fk| fk.name == raw.name) {
                Some(i) => fks[i].references.push(reference),
                None => fks.push(ForeignKey {
                    name: raw.name,
                    references: vec![reference],
                    on_update: FkAction::from_code(raw.on_update),
                    on_delete: FkAction::from_code(raw.on_delete),
                }),
            }
        }
        debug!("loaded {} foreign keys for {}", fks.len(), name);
        let table = self.tables.get_mut(name).expect("table just looked up");
        table.set_foreign_keys(fks);
        Ok(())
    }

    async fn load_indexes(&mut self, name: &str, client: &impl GenericClient) -> MetaResult<()> {
        let oid = self.table(name)?.oid();
        let raws = introspect::fetch_indexes(client, oid).await?;
        let mut indexes = Vec::with_capacity(raws.len());
        for raw in raws {
            let mut columns = Vec::with_capacity(raw.ordinals.len());
            for ordinal in &raw.ordinals {
                let attname = introspect::resolve_ordinal(client, oid, *ordinal).await?;
                if self.table(name)?.column(&attname).is_none() {
                    return Err(MetaError::unresolved(format!(
                        "Unknown column [{name}.{attname}] in index {}",
                        raw.name
                    )));
                }
                columns.push(attname);
            }
            indexes.push(Index {
                name: raw.name,
                unique: raw.unique,
                columns,
            });
        }
        debug!("loaded {} indexes for {}", indexes.len(), name);
        let table = self.tables.get_mut(name).expect("table just looked up");
        table.set_indexes(indexes);
        Ok(())
    }

    async fn load_primary_key(
        &mut self,
        name: &str,
        client: &impl GenericClient,
    ) -> MetaResult<()> {
        let oid = self.table(name)?.oid();
        let ordinals = introspect::fetch_primary_key_ordinals(client, oid).await?;
        let pk = match ordinals {
            Some(ordinals) if !ordinals.is_empty() => {
                let mut columns = Vec::with_capacity(ordinals.len());
                for ordinal in ordinals {
                    let attname = introspect::resolve_ordinal(client, oid, ordinal).await?;
                    if self.table(name)?.column(&attname).is_none() {
                        return Err(MetaError::unresolved(format!(
                            "Unknown column [{name}.{attname}] in primary key"
                        )));
                    }
                    columns.push(attname);
                }
                Some(PrimaryKey {
                    name: columns[0].clone(),
                    columns,
                })
            }
            _ => None,
        };
        debug!("loaded primary key for {}: {:?}", name, pk.is_some());
        let table = self.tables.get_mut(name).expect("table just looked up");
        table.set_primary_key(pk);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn try_connect() -> Option<tokio_postgres::Client> {
        let database_url = std::env::var("DATABASE_URL").ok()?;
        let (client, connection) = tokio_postgres::connect(&database_url, tokio_postgres::NoTls)
            .await
            .expect("Failed to connect to DATABASE_URL with NoTls");
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("tokio-postgres connection error: {e}");
            }
        });
        Some(client)
    }

    #[test]
    fn unknown_table_lookup_is_unresolved() {
        let db = Database::new("public");
        assert!(matches!(
            db.table("missing"),
            Err(MetaError::UnresolvedReference(_))
        ));
    }

    #[tokio::test]
    async fn introspects_catalog_tables() {
        let Some(client) = try_connect().await else {
            eprintln!("DATABASE_URL not set; skipping");
            return;
        };

        // pg_am is a small catalog relation with no array columns.
        let mut db = Database::new("pg_catalog");
        db.refresh(&client).await.unwrap();
        assert!(db.table("pg_am").is_ok());

        let columns = db.columns("pg_am", &client).await.unwrap();
        assert!(!columns.is_empty());
        assert!(columns.iter().any(|c| c.name == "amname"));

        // Second access serves the cached graph.
        let first: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let again: Vec<String> = db
            .columns("pg_am", &client)
            .await
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(first, again);
        assert!(db.table("pg_am").unwrap().columns_loaded());
    }
}
