//! DDL and seed DML emitters.
//!
//! - [`CoreDdlEmitter`]: the fixed `dms.*` storage schema
//! - [`RelationalModelDdlEmitter`]: tables, views, indexes and triggers for a
//!   derived resource mapping
//! - [`SeedDmlEmitter`]: guarded, self-validating effective-schema seed data
//!
//! [`DdlScript`] composes the three into one deployable script.

mod core_ddl;
mod relational;
mod seed;

pub use core_ddl::CoreDdlEmitter;
pub use relational::RelationalModelDdlEmitter;
pub use seed::SeedDmlEmitter;

use crate::dialect::{Dialect, SqlDialect, SqlDialectKind};
use crate::error::{DdlError, Result};
use crate::model::{DbTableName, DerivedRelationalModelSet, EffectiveSchemaInfo};
use crate::writer::SqlWriter;
use tracing::info;

/// Schema holding the core storage tables.
pub const DMS_SCHEMA: &str = "dms";

/// Sequence feeding `ContentVersion` / `IdentityVersion`.
pub const CHANGE_VERSION_SEQUENCE: &str = "ChangeVersionSequence";

pub(crate) fn dms_table(name: &'static str) -> DbTableName {
    DbTableName::from_static(DMS_SCHEMA, name)
}

const PHASE_RULE: &str = "-- ==========================================================";

/// Three-line banner opening an output phase.
pub(crate) fn write_phase_header(writer: &mut SqlWriter<'_>, title: &str) {
    writer.append_line(PHASE_RULE);
    writer.append_line(&format!("-- {}", title));
    writer.append_line(PHASE_RULE);
    writer.new_line();
}

/// Guarded `CREATE TABLE` with one comma-separated definition per line.
pub(crate) fn write_table(writer: &mut SqlWriter<'_>, table: &DbTableName, definitions: &[String]) {
    let header = writer.dialect().create_table_header(table);
    writer.append_line(&header);
    writer.append_line("(");
    {
        let mut body = writer.indent();
        let last = definitions.len().saturating_sub(1);
        for (i, definition) in definitions.iter().enumerate() {
            if i < last {
                body.append(definition).append_line(",");
            } else {
                body.append_line(definition);
            }
        }
    }
    writer.append_line(");");
    writer.new_line();
}

/// A full deployment script: core DDL, relational DDL and seed DML.
///
/// On SQL Server each section starts a new batch (`GO`).
///
/// ```rust
/// use edfi_dms_ddl::dialect::SqlDialectKind;
/// use edfi_dms_ddl::emit::DdlScript;
///
/// let sql = DdlScript::new(SqlDialectKind::Pgsql).emit().unwrap();
/// assert!(sql.contains("CREATE SCHEMA IF NOT EXISTS \"dms\";"));
/// ```
#[derive(Debug, Clone)]
pub struct DdlScript<'a> {
    dialect: Dialect,
    include_core: bool,
    model_set: Option<&'a DerivedRelationalModelSet>,
    effective_schema: Option<&'a EffectiveSchemaInfo>,
}

impl<'a> DdlScript<'a> {
    /// A script containing only the core DDL.
    pub fn new(dialect: impl Into<Dialect>) -> Self {
        Self {
            dialect: dialect.into(),
            include_core: true,
            model_set: None,
            effective_schema: None,
        }
    }

    pub fn with_core(mut self, include: bool) -> Self {
        self.include_core = include;
        self
    }

    /// Add relational DDL for a model set.
    pub fn with_relational(mut self, model_set: &'a DerivedRelationalModelSet) -> Self {
        self.model_set = Some(model_set);
        self
    }

    /// Add seed DML for an effective schema.
    pub fn with_seed(mut self, effective_schema: &'a EffectiveSchemaInfo) -> Self {
        self.effective_schema = Some(effective_schema);
        self
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Render every included section in order.
    pub fn emit(&self) -> Result<String> {
        let mut sections = Vec::with_capacity(3);

        if self.include_core {
            sections.push(CoreDdlEmitter::new(self.dialect).emit()?);
        }
        if let Some(model_set) = self.model_set {
            sections.push(RelationalModelDdlEmitter::new(self.dialect).emit(model_set)?);
        }
        if let Some(effective_schema) = self.effective_schema {
            sections.push(SeedDmlEmitter::new(self.dialect).emit(effective_schema)?);
        }

        if sections.is_empty() {
            return Err(DdlError::Config("No script sections selected".into()));
        }

        let separator = match self.dialect.kind() {
            SqlDialectKind::Mssql => "GO\n\n",
            SqlDialectKind::Pgsql => "",
        };
        let script = sections.join(separator);
        info!(
            dialect = %self.dialect.kind(),
            sections = sections.len(),
            bytes = script.len(),
            "Deployment script assembled"
        );
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_model_set;

    #[test]
    fn test_write_table_commas() {
        let dialect = Dialect::create(SqlDialectKind::Pgsql);
        let mut writer = SqlWriter::new(&dialect);
        write_table(
            &mut writer,
            &dms_table("T"),
            &["\"A\" integer NOT NULL".to_string(), "PRIMARY KEY (\"A\")".to_string()],
        );
        assert_eq!(
            writer.into_sql(),
            "CREATE TABLE IF NOT EXISTS \"dms\".\"T\"\n(\n    \"A\" integer NOT NULL,\n    PRIMARY KEY (\"A\")\n);\n\n"
        );
    }

    #[test]
    fn test_script_sections_in_order() {
        let set = sample_model_set(SqlDialectKind::Pgsql);
        let sql = DdlScript::new(SqlDialectKind::Pgsql)
            .with_relational(&set)
            .with_seed(&set.effective_schema)
            .emit()
            .unwrap();
        let core = sql.find("CREATE TABLE IF NOT EXISTS \"dms\".\"Descriptor\"").unwrap();
        let relational = sql.find("CREATE TABLE IF NOT EXISTS \"edfi\".\"School\"").unwrap();
        let seed = sql.find("INSERT INTO \"dms\".\"ResourceKey\"").unwrap();
        assert!(core < relational && relational < seed);
    }

    #[test]
    fn test_mssql_sections_separated_by_go() {
        let set = sample_model_set(SqlDialectKind::Mssql);
        let sql = DdlScript::new(SqlDialectKind::Mssql)
            .with_seed(&set.effective_schema)
            .emit()
            .unwrap();
        let seed = sql.find("-- Phase 7").unwrap();
        let banner = sql[..seed].trim_end_matches(&format!("{}\n", PHASE_RULE));
        assert!(banner.ends_with("END;\n\nGO\n\n"));
    }

    #[test]
    fn test_empty_script_rejected() {
        let err = DdlScript::new(SqlDialectKind::Pgsql)
            .with_core(false)
            .emit()
            .unwrap_err();
        assert!(matches!(err, DdlError::Config(_)));
    }
}
