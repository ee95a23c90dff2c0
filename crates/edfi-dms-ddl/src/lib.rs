//! # edfi-dms-ddl
//!
//! Deterministic DDL and seed DML generation for the Ed-Fi Data Management
//! Service relational backend, targeting PostgreSQL and SQL Server.
//!
//! Three emitters turn immutable model values into SQL text:
//!
//! - **Core DDL**: the fixed `dms.*` storage schema, sequence and triggers
//! - **Relational DDL**: per-resource tables, abstract identity tables,
//!   union views, indexes and maintenance triggers
//! - **Seed DML**: guarded, self-validating effective-schema metadata rows
//!
//! Output is byte-for-byte stable: `\n` line endings, no trailing
//! whitespace, and every collection walked in its declared order. Every
//! `CREATE` is guarded so a script can be applied more than once.
//!
//! ## Example
//!
//! ```rust,no_run
//! use edfi_dms_ddl::{DdlScript, DerivedRelationalModelSet};
//!
//! fn main() -> edfi_dms_ddl::Result<()> {
//!     let model = DerivedRelationalModelSet::load("relational-model.json")?;
//!     let sql = DdlScript::new(model.dialect)
//!         .with_relational(&model)
//!         .with_seed(&model.effective_schema)
//!         .emit()?;
//!     println!("{}", sql);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod dialect;
pub mod emit;
pub mod error;
pub mod identity;
pub mod model;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use config::{DdlConfig, SectionsConfig};
pub use dialect::{Dialect, SqlDialect, SqlDialectKind};
pub use emit::{CoreDdlEmitter, DdlScript, RelationalModelDdlEmitter, SeedDmlEmitter};
pub use error::{DdlError, Result};
pub use model::{DerivedRelationalModelSet, EffectiveSchemaInfo};
pub use writer::SqlWriter;
