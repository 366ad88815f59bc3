//! # pgmeta
//!
//! PostgreSQL schema introspection and parameterized SQL building.
//!
//! Two halves share one connection abstraction:
//!
//! - **Schema side**: [`Database`] reverse-engineers tables, columns,
//!   types, defaults, domains, foreign keys, indexes, and primary keys from
//!   the system catalogs into a portable metadata model, lazily and cached
//!   per table.
//! - **Query side**: [`Condition`] composes nested AND/OR trees into a
//!   single [`Statement`], a SQL template whose placeholders and bound
//!   values can never drift apart, with operator rewriting for arrays,
//!   NULLs, and BETWEEN.
//!
//! ## Introspection
//!
//! ```ignore
//! use pgmeta::Database;
//!
//! let mut db = Database::new("public");
//! db.refresh(&client).await?;
//! for col in db.columns("users", &client).await? {
//!     println!("{} {:?}", col.name, col.logical);
//! }
//! ```
//!
//! ## Conditions
//!
//! ```ignore
//! use pgmeta::{Condition, Rhs};
//!
//! let mut c = Condition::new();
//! c.add_and("status", Rhs::value("active"))?
//!     .add_or("id", Rhs::list(vec![1_i64, 2, 3]))?;
//! let stmt = c.clause().expect("non-empty");
//! let rows = stmt.query(&client).await?;
//! ```

pub mod client;
pub mod condition;
pub mod dialect;
pub mod error;
pub mod ident;
pub mod row;
pub mod schema;
pub mod select;
pub mod statement;

pub use client::GenericClient;
pub use condition::{Condition, Lhs, Op, Quote, Rhs};
pub use dialect::{Dialect, PostgresDialect};
pub use error::{MetaError, MetaResult};
pub use ident::{Ident, IntoIdent};
pub use row::RowExt;
pub use schema::{
    Column, Database, FkAction, FkReference, ForeignKey, Index, LogicalType, PrimaryKey, Table,
};
pub use select::Select;
pub use statement::Statement;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config};
