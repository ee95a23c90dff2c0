//! SQL dialects.
//!
//! A dialect turns abstract DDL requests (create this table, add this foreign
//! key) into exact SQL text for one engine. Two dialects exist:
//!
//! - [`PgsqlDialect`]: PostgreSQL, guards via `IF NOT EXISTS` and `DO $$` blocks
//! - [`MssqlDialect`]: SQL Server, guards via `sys.*` catalog lookups
//!
//! Each dialect owns the rules of its own engine ([`PgsqlRules`] /
//! [`MssqlRules`]), so a dialect paired with the wrong rules cannot be built.
//! The closed [`Dialect`] enum provides static dispatch over both.
//!
//! # Usage
//!
//! ```rust
//! use edfi_dms_ddl::dialect::{Dialect, SqlDialect, SqlDialectKind};
//!
//! let dialect = Dialect::create(SqlDialectKind::Mssql);
//! assert_eq!(dialect.quote_identifier("School"), "[School]");
//! ```

mod mssql;
mod pgsql;
mod rules;

pub use mssql::MssqlDialect;
pub use pgsql::PgsqlDialect;
pub use rules::{DialectRules, DialectRulesImpl, MssqlRules, PgsqlRules, ScalarTypeDefaults};

use crate::error::{DdlError, Result};
use crate::model::{DbColumnName, DbSchemaName, DbTableName, ReferentialAction, RelationalScalarType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dialect tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialectKind {
    Pgsql,
    Mssql,
}

impl fmt::Display for SqlDialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialectKind::Pgsql => f.write_str("pgsql"),
            SqlDialectKind::Mssql => f.write_str("mssql"),
        }
    }
}

impl FromStr for SqlDialectKind {
    type Err = DdlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pgsql" | "postgres" | "postgresql" | "pg" => Ok(SqlDialectKind::Pgsql),
            "mssql" | "sqlserver" | "sql-server" => Ok(SqlDialectKind::Mssql),
            _ => Err(DdlError::UnsupportedDialect(s.to_string())),
        }
    }
}

/// Idempotent creation idiom a dialect uses for an object kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlPattern {
    CreateIfNotExists,
    CreateOrReplace,
    CreateOrAlter,
    DropThenCreate,
}

/// A foreign key to add with a guarded `ALTER TABLE`.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKeyDef<'a> {
    pub table: &'a DbTableName,
    pub name: &'a str,
    pub columns: &'a [DbColumnName],
    pub target_table: &'a DbTableName,
    pub target_columns: &'a [DbColumnName],
    pub on_delete: ReferentialAction,
    pub on_update: ReferentialAction,
}

/// SQL syntax strategy for one database engine.
///
/// All methods are pure: the same arguments always render the same text.
pub trait SqlDialect: Send + Sync {
    /// The dialect tag.
    fn kind(&self) -> SqlDialectKind;

    /// Identifier limits and type defaults.
    fn rules(&self) -> &dyn DialectRules;

    /// Quote an identifier.
    ///
    /// - PostgreSQL: `"identifier"` with embedded `"` doubled
    /// - SQL Server: `[identifier]` with embedded `]` doubled
    fn quote_identifier(&self, name: &str) -> String;

    /// Schema-qualify and quote a table or view name.
    fn qualify_table(&self, table: &DbTableName) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(table.schema().as_str()),
            self.quote_identifier(table.name())
        )
    }

    /// Schema-qualify and quote an arbitrary object name.
    fn qualify_name(&self, schema: &DbSchemaName, name: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(schema.as_str()),
            self.quote_identifier(name)
        )
    }

    /// Comma-separated quoted column list.
    fn column_list(&self, columns: &[DbColumnName]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Physical type of a scalar column.
    fn render_column_type(&self, scalar_type: &RelationalScalarType) -> String {
        self.rules().scalar_type_defaults().render(scalar_type)
    }

    fn document_id_column_type(&self) -> &'static str;
    fn ordinal_column_type(&self) -> &'static str;
    fn smallint_column_type(&self) -> &'static str;
    fn uuid_column_type(&self) -> &'static str;
    fn json_column_type(&self) -> &'static str;

    /// Auto-incrementing 64-bit key type.
    fn identity_bigint_column_type(&self) -> &'static str;

    /// Default expression producing the current UTC timestamp.
    fn current_timestamp_default_expression(&self) -> &'static str;

    /// Fixed-length binary column type.
    fn render_binary_column_type(&self, length: usize) -> String;

    /// Default expression drawing the next value of a sequence.
    fn render_sequence_default_expression(&self, schema: &DbSchemaName, sequence: &str) -> String;

    fn trigger_creation_pattern(&self) -> DdlPattern;
    fn function_creation_pattern(&self) -> DdlPattern;
    fn view_creation_pattern(&self) -> DdlPattern;

    fn create_schema_if_not_exists(&self, schema: &DbSchemaName) -> String;

    /// First line(s) of a guarded `CREATE TABLE`, without the column list.
    fn create_table_header(&self, table: &DbTableName) -> String;

    fn drop_trigger_if_exists(&self, table: &DbTableName, trigger_name: &str) -> String;

    fn create_sequence_if_not_exists(
        &self,
        schema: &DbSchemaName,
        sequence: &str,
        start_with: i64,
    ) -> String;

    /// Guarded `CREATE INDEX`. Fails when `columns` is empty.
    fn create_index_if_not_exists(
        &self,
        table: &DbTableName,
        index_name: &str,
        columns: &[DbColumnName],
        is_unique: bool,
    ) -> Result<String>;

    /// Guarded `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY`.
    ///
    /// Fails when there are no columns or the column counts differ.
    fn add_foreign_key_constraint(&self, fk: &ForeignKeyDef<'_>) -> Result<String>;

    /// Guarded `ALTER TABLE ... ADD CONSTRAINT ... UNIQUE`.
    fn add_unique_constraint(
        &self,
        table: &DbTableName,
        name: &str,
        columns: &[DbColumnName],
    ) -> Result<String>;

    /// Guarded `ALTER TABLE ... ADD CONSTRAINT ... CHECK`. The expression is
    /// emitted verbatim.
    fn add_check_constraint(&self, table: &DbTableName, name: &str, expression: &str) -> String;

    /// `name type NULL|NOT NULL [DEFAULT expr]`.
    fn render_column_definition(
        &self,
        column: &DbColumnName,
        sql_type: &str,
        is_nullable: bool,
        default_expression: Option<&str>,
    ) -> String {
        let nullability = if is_nullable { "NULL" } else { "NOT NULL" };
        match default_expression {
            Some(expr) => format!(
                "{} {} {} DEFAULT {}",
                self.quote_identifier(column.as_str()),
                sql_type,
                nullability,
                expr
            ),
            None => format!(
                "{} {} {}",
                self.quote_identifier(column.as_str()),
                sql_type,
                nullability
            ),
        }
    }

    /// Column definition whose default carries a constraint name where the
    /// engine supports one.
    fn render_column_definition_with_named_default(
        &self,
        column: &DbColumnName,
        sql_type: &str,
        is_nullable: bool,
        constraint_name: &str,
        default_expression: &str,
    ) -> String;

    /// Persisted computed column mirroring `canonical`, NULL when `presence` is NULL.
    fn render_computed_column_definition(
        &self,
        column: &DbColumnName,
        sql_type: &str,
        canonical: &DbColumnName,
        presence: Option<&DbColumnName>,
    ) -> String;

    /// `PRIMARY KEY (cols)`.
    fn render_primary_key_clause(&self, columns: &[DbColumnName]) -> Result<String> {
        if columns.is_empty() {
            return Err(DdlError::invalid_model(
                "At least one column is required for a primary key",
            ));
        }
        Ok(format!("PRIMARY KEY ({})", self.column_list(columns)))
    }

    /// `CONSTRAINT name PRIMARY KEY [CLUSTERED|NONCLUSTERED] (cols)`.
    fn render_named_primary_key_clause(
        &self,
        name: &str,
        columns: &[DbColumnName],
        clustered: bool,
    ) -> Result<String>;

    fn render_referential_action(&self, action: ReferentialAction) -> &'static str {
        match action {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Cascade => "CASCADE",
        }
    }

    /// Guarded extension install; `None` for engines without extensions.
    fn create_extension_if_not_exists(&self, name: &str) -> Option<String>;

    /// Stored function computing RFC 4122 version-5 UUIDs.
    fn create_uuidv5_function(&self, schema: &DbSchemaName) -> String;

    fn render_binary_literal(&self, value: &[u8]) -> String;
    fn render_boolean_literal(&self, value: bool) -> &'static str;

    /// Quoted, escaped string literal.
    fn render_string_literal(&self, value: &str) -> String;

    fn render_smallint_literal(&self, value: i16) -> String {
        value.to_string()
    }

    fn render_integer_literal(&self, value: i32) -> String {
        value.to_string()
    }
}

/// Enum-based static dispatch over the two dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Pgsql(PgsqlDialect),
    Mssql(MssqlDialect),
}

impl Dialect {
    /// Build the dialect for a tag.
    pub fn create(kind: SqlDialectKind) -> Self {
        Self::from_rules(DialectRulesImpl::for_kind(kind))
    }

    /// Build the dialect matching a rules instance.
    pub fn from_rules(rules: impl Into<DialectRulesImpl>) -> Self {
        match rules.into() {
            DialectRulesImpl::Pgsql(rules) => Dialect::Pgsql(PgsqlDialect::new(rules)),
            DialectRulesImpl::Mssql(rules) => Dialect::Mssql(MssqlDialect::new(rules)),
        }
    }

    /// Build a dialect from a name (`pgsql`, `postgres`, `mssql`, `sqlserver`, ...).
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        Ok(Self::create(db_type.parse()?))
    }
}

impl From<SqlDialectKind> for Dialect {
    fn from(kind: SqlDialectKind) -> Self {
        Dialect::create(kind)
    }
}

impl From<PgsqlDialect> for Dialect {
    fn from(dialect: PgsqlDialect) -> Self {
        Dialect::Pgsql(dialect)
    }
}

impl From<MssqlDialect> for Dialect {
    fn from(dialect: MssqlDialect) -> Self {
        Dialect::Mssql(dialect)
    }
}

macro_rules! dispatch {
    ($self:ident, $d:ident => $call:expr) => {
        match $self {
            Dialect::Pgsql($d) => $call,
            Dialect::Mssql($d) => $call,
        }
    };
}

impl SqlDialect for Dialect {
    fn kind(&self) -> SqlDialectKind {
        dispatch!(self, d => d.kind())
    }

    fn rules(&self) -> &dyn DialectRules {
        dispatch!(self, d => d.rules())
    }

    fn quote_identifier(&self, name: &str) -> String {
        dispatch!(self, d => d.quote_identifier(name))
    }

    fn document_id_column_type(&self) -> &'static str {
        dispatch!(self, d => d.document_id_column_type())
    }

    fn ordinal_column_type(&self) -> &'static str {
        dispatch!(self, d => d.ordinal_column_type())
    }

    fn smallint_column_type(&self) -> &'static str {
        dispatch!(self, d => d.smallint_column_type())
    }

    fn uuid_column_type(&self) -> &'static str {
        dispatch!(self, d => d.uuid_column_type())
    }

    fn json_column_type(&self) -> &'static str {
        dispatch!(self, d => d.json_column_type())
    }

    fn identity_bigint_column_type(&self) -> &'static str {
        dispatch!(self, d => d.identity_bigint_column_type())
    }

    fn current_timestamp_default_expression(&self) -> &'static str {
        dispatch!(self, d => d.current_timestamp_default_expression())
    }

    fn render_binary_column_type(&self, length: usize) -> String {
        dispatch!(self, d => d.render_binary_column_type(length))
    }

    fn render_sequence_default_expression(&self, schema: &DbSchemaName, sequence: &str) -> String {
        dispatch!(self, d => d.render_sequence_default_expression(schema, sequence))
    }

    fn trigger_creation_pattern(&self) -> DdlPattern {
        dispatch!(self, d => d.trigger_creation_pattern())
    }

    fn function_creation_pattern(&self) -> DdlPattern {
        dispatch!(self, d => d.function_creation_pattern())
    }

    fn view_creation_pattern(&self) -> DdlPattern {
        dispatch!(self, d => d.view_creation_pattern())
    }

    fn create_schema_if_not_exists(&self, schema: &DbSchemaName) -> String {
        dispatch!(self, d => d.create_schema_if_not_exists(schema))
    }

    fn create_table_header(&self, table: &DbTableName) -> String {
        dispatch!(self, d => d.create_table_header(table))
    }

    fn drop_trigger_if_exists(&self, table: &DbTableName, trigger_name: &str) -> String {
        dispatch!(self, d => d.drop_trigger_if_exists(table, trigger_name))
    }

    fn create_sequence_if_not_exists(
        &self,
        schema: &DbSchemaName,
        sequence: &str,
        start_with: i64,
    ) -> String {
        dispatch!(self, d => d.create_sequence_if_not_exists(schema, sequence, start_with))
    }

    fn create_index_if_not_exists(
        &self,
        table: &DbTableName,
        index_name: &str,
        columns: &[DbColumnName],
        is_unique: bool,
    ) -> Result<String> {
        dispatch!(self, d => d.create_index_if_not_exists(table, index_name, columns, is_unique))
    }

    fn add_foreign_key_constraint(&self, fk: &ForeignKeyDef<'_>) -> Result<String> {
        dispatch!(self, d => d.add_foreign_key_constraint(fk))
    }

    fn add_unique_constraint(
        &self,
        table: &DbTableName,
        name: &str,
        columns: &[DbColumnName],
    ) -> Result<String> {
        dispatch!(self, d => d.add_unique_constraint(table, name, columns))
    }

    fn add_check_constraint(&self, table: &DbTableName, name: &str, expression: &str) -> String {
        dispatch!(self, d => d.add_check_constraint(table, name, expression))
    }

    fn render_column_definition_with_named_default(
        &self,
        column: &DbColumnName,
        sql_type: &str,
        is_nullable: bool,
        constraint_name: &str,
        default_expression: &str,
    ) -> String {
        dispatch!(self, d => d.render_column_definition_with_named_default(
            column,
            sql_type,
            is_nullable,
            constraint_name,
            default_expression
        ))
    }

    fn render_computed_column_definition(
        &self,
        column: &DbColumnName,
        sql_type: &str,
        canonical: &DbColumnName,
        presence: Option<&DbColumnName>,
    ) -> String {
        dispatch!(self, d => d.render_computed_column_definition(column, sql_type, canonical, presence))
    }

    fn render_named_primary_key_clause(
        &self,
        name: &str,
        columns: &[DbColumnName],
        clustered: bool,
    ) -> Result<String> {
        dispatch!(self, d => d.render_named_primary_key_clause(name, columns, clustered))
    }

    fn create_extension_if_not_exists(&self, name: &str) -> Option<String> {
        dispatch!(self, d => d.create_extension_if_not_exists(name))
    }

    fn create_uuidv5_function(&self, schema: &DbSchemaName) -> String {
        dispatch!(self, d => d.create_uuidv5_function(schema))
    }

    fn render_binary_literal(&self, value: &[u8]) -> String {
        dispatch!(self, d => d.render_binary_literal(value))
    }

    fn render_boolean_literal(&self, value: bool) -> &'static str {
        dispatch!(self, d => d.render_boolean_literal(value))
    }

    fn render_string_literal(&self, value: &str) -> String {
        dispatch!(self, d => d.render_string_literal(value))
    }
}

/// Reject an empty column list for the named object kind.
pub(crate) fn require_columns(columns: &[DbColumnName], what: &str) -> Result<()> {
    if columns.is_empty() {
        return Err(DdlError::invalid_model(format!(
            "At least one column is required for {}",
            what
        )));
    }
    Ok(())
}

/// Reject foreign keys with no columns or mismatched column counts.
pub(crate) fn check_foreign_key_arity(fk: &ForeignKeyDef<'_>) -> Result<()> {
    require_columns(fk.columns, &format!("foreign key '{}'", fk.name))?;
    if fk.columns.len() != fk.target_columns.len() {
        return Err(DdlError::invalid_model(format!(
            "Foreign key '{}' column count ({}) must match target column count ({})",
            fk.name,
            fk.columns.len(),
            fk.target_columns.len()
        )));
    }
    Ok(())
}
