//! SQL Server dialect.

use super::{
    check_foreign_key_arity, require_columns, DdlPattern, DialectRules, ForeignKeyDef,
    MssqlRules, SqlDialect, SqlDialectKind,
};
use crate::core::identifier::{escape_string_literal, quote_mssql};
use crate::error::Result;
use crate::model::{DbColumnName, DbSchemaName, DbTableName};

/// SQL Server dialect.
///
/// SQL Server lacks `IF NOT EXISTS` on most DDL, so every guard is an
/// `IF NOT EXISTS (SELECT 1 FROM sys.* ...)` probe or an `OBJECT_ID` check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MssqlDialect {
    rules: MssqlRules,
}

impl MssqlDialect {
    pub fn new(rules: MssqlRules) -> Self {
        Self { rules }
    }

    /// `N'...'` literal for catalog lookups.
    fn catalog_literal(value: &str) -> String {
        format!("N'{}'", escape_string_literal(value))
    }
}

impl SqlDialect for MssqlDialect {
    fn kind(&self) -> SqlDialectKind {
        SqlDialectKind::Mssql
    }

    fn rules(&self) -> &dyn DialectRules {
        &self.rules
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_mssql(name)
    }

    fn document_id_column_type(&self) -> &'static str {
        "bigint"
    }

    fn ordinal_column_type(&self) -> &'static str {
        "int"
    }

    fn smallint_column_type(&self) -> &'static str {
        "smallint"
    }

    fn uuid_column_type(&self) -> &'static str {
        "uniqueidentifier"
    }

    fn json_column_type(&self) -> &'static str {
        "nvarchar(max)"
    }

    fn identity_bigint_column_type(&self) -> &'static str {
        "bigint IDENTITY(1,1)"
    }

    fn current_timestamp_default_expression(&self) -> &'static str {
        "(sysutcdatetime())"
    }

    fn render_binary_column_type(&self, length: usize) -> String {
        format!("binary({})", length)
    }

    fn render_sequence_default_expression(&self, schema: &DbSchemaName, sequence: &str) -> String {
        format!("(NEXT VALUE FOR {})", self.qualify_name(schema, sequence))
    }

    fn trigger_creation_pattern(&self) -> DdlPattern {
        DdlPattern::CreateOrAlter
    }

    fn function_creation_pattern(&self) -> DdlPattern {
        DdlPattern::CreateOrAlter
    }

    fn view_creation_pattern(&self) -> DdlPattern {
        DdlPattern::CreateOrAlter
    }

    fn create_schema_if_not_exists(&self, schema: &DbSchemaName) -> String {
        // CREATE SCHEMA must be alone in its batch, hence EXEC.
        format!(
            "IF NOT EXISTS (SELECT 1 FROM sys.schemas WHERE name = {})\n    EXEC('CREATE SCHEMA {}');",
            Self::catalog_literal(schema.as_str()),
            escape_string_literal(&self.quote_identifier(schema.as_str()))
        )
    }

    fn create_table_header(&self, table: &DbTableName) -> String {
        format!(
            "IF OBJECT_ID({}, N'U') IS NULL\nCREATE TABLE {}",
            Self::catalog_literal(&table.to_string()),
            self.qualify_table(table)
        )
    }

    fn drop_trigger_if_exists(&self, table: &DbTableName, trigger_name: &str) -> String {
        // Triggers are schema-scoped in SQL Server.
        format!(
            "DROP TRIGGER IF EXISTS {};",
            self.qualify_name(table.schema(), trigger_name)
        )
    }

    fn create_sequence_if_not_exists(
        &self,
        schema: &DbSchemaName,
        sequence: &str,
        start_with: i64,
    ) -> String {
        format!(
            "IF NOT EXISTS (\n    SELECT 1 FROM sys.sequences s\n    JOIN sys.schemas sch ON s.schema_id = sch.schema_id\n    WHERE sch.name = {} AND s.name = {}\n)\nCREATE SEQUENCE {} START WITH {};",
            Self::catalog_literal(schema.as_str()),
            Self::catalog_literal(sequence),
            self.qualify_name(schema, sequence),
            start_with
        )
    }

    fn create_index_if_not_exists(
        &self,
        table: &DbTableName,
        index_name: &str,
        columns: &[DbColumnName],
        is_unique: bool,
    ) -> Result<String> {
        require_columns(columns, &format!("index '{}'", index_name))?;
        Ok(format!(
            "IF NOT EXISTS (\n    SELECT 1 FROM sys.indexes i\n    JOIN sys.tables t ON i.object_id = t.object_id\n    JOIN sys.schemas s ON t.schema_id = s.schema_id\n    WHERE s.name = {} AND t.name = {} AND i.name = {}\n)\nCREATE {}INDEX {} ON {} ({});",
            Self::catalog_literal(table.schema().as_str()),
            Self::catalog_literal(table.name()),
            Self::catalog_literal(index_name),
            if is_unique { "UNIQUE " } else { "" },
            self.quote_identifier(index_name),
            self.qualify_table(table),
            self.column_list(columns)
        ))
    }

    fn add_foreign_key_constraint(&self, fk: &ForeignKeyDef<'_>) -> Result<String> {
        check_foreign_key_arity(fk)?;
        Ok(format!(
            "IF NOT EXISTS (\n    SELECT 1 FROM sys.foreign_keys\n    WHERE name = {}\n)\nALTER TABLE {}\nADD CONSTRAINT {}\nFOREIGN KEY ({})\nREFERENCES {} ({})\nON DELETE {}\nON UPDATE {};",
            Self::catalog_literal(fk.name),
            self.qualify_table(fk.table),
            self.quote_identifier(fk.name),
            self.column_list(fk.columns),
            self.qualify_table(fk.target_table),
            self.column_list(fk.target_columns),
            self.render_referential_action(fk.on_delete),
            self.render_referential_action(fk.on_update)
        ))
    }

    fn add_unique_constraint(
        &self,
        table: &DbTableName,
        name: &str,
        columns: &[DbColumnName],
    ) -> Result<String> {
        require_columns(columns, &format!("unique constraint '{}'", name))?;
        Ok(format!(
            "IF NOT EXISTS (\n    SELECT 1 FROM sys.key_constraints\n    WHERE name = {} AND type = 'UQ'\n)\nALTER TABLE {}\nADD CONSTRAINT {} UNIQUE ({});",
            Self::catalog_literal(name),
            self.qualify_table(table),
            self.quote_identifier(name),
            self.column_list(columns)
        ))
    }

    fn add_check_constraint(&self, table: &DbTableName, name: &str, expression: &str) -> String {
        format!(
            "IF NOT EXISTS (\n    SELECT 1 FROM sys.check_constraints\n    WHERE name = {}\n)\nALTER TABLE {}\nADD CONSTRAINT {} CHECK ({});",
            Self::catalog_literal(name),
            self.qualify_table(table),
            self.quote_identifier(name),
            expression
        )
    }

    fn render_column_definition_with_named_default(
        &self,
        column: &DbColumnName,
        sql_type: &str,
        is_nullable: bool,
        constraint_name: &str,
        default_expression: &str,
    ) -> String {
        format!(
            "{} {} {} CONSTRAINT {} DEFAULT {}",
            self.quote_identifier(column.as_str()),
            sql_type,
            if is_nullable { "NULL" } else { "NOT NULL" },
            self.quote_identifier(constraint_name),
            default_expression
        )
    }

    fn render_computed_column_definition(
        &self,
        column: &DbColumnName,
        _sql_type: &str,
        canonical: &DbColumnName,
        presence: Option<&DbColumnName>,
    ) -> String {
        // Computed columns take the type of their expression.
        let canonical = self.quote_identifier(canonical.as_str());
        let expression = match presence {
            Some(presence) => format!(
                "CASE WHEN {} IS NULL THEN NULL ELSE {} END",
                self.quote_identifier(presence.as_str()),
                canonical
            ),
            None => canonical,
        };
        format!(
            "{} AS ({}) PERSISTED",
            self.quote_identifier(column.as_str()),
            expression
        )
    }

    fn render_named_primary_key_clause(
        &self,
        name: &str,
        columns: &[DbColumnName],
        clustered: bool,
    ) -> Result<String> {
        require_columns(columns, &format!("primary key '{}'", name))?;
        Ok(format!(
            "CONSTRAINT {} PRIMARY KEY {} ({})",
            self.quote_identifier(name),
            if clustered { "CLUSTERED" } else { "NONCLUSTERED" },
            self.column_list(columns)
        ))
    }

    fn create_extension_if_not_exists(&self, _name: &str) -> Option<String> {
        None
    }

    fn create_uuidv5_function(&self, schema: &DbSchemaName) -> String {
        // uniqueidentifier stores its first three groups little-endian; the
        // namespace is swapped to network order before hashing and the result
        // swapped back before the final cast.
        format!(
            r#"CREATE OR ALTER FUNCTION {}(@namespace_uuid uniqueidentifier, @name_text nvarchar(max))
RETURNS uniqueidentifier
WITH SCHEMABINDING
AS
BEGIN
    DECLARE @ns varbinary(16) = CAST(@namespace_uuid AS varbinary(16));
    DECLARE @ns_be varbinary(16) =
        SUBSTRING(@ns, 4, 1) + SUBSTRING(@ns, 3, 1) + SUBSTRING(@ns, 2, 1) + SUBSTRING(@ns, 1, 1)
        + SUBSTRING(@ns, 6, 1) + SUBSTRING(@ns, 5, 1)
        + SUBSTRING(@ns, 8, 1) + SUBSTRING(@ns, 7, 1)
        + SUBSTRING(@ns, 9, 8);
    DECLARE @name_bytes varbinary(max) = CAST(CAST(@name_text COLLATE Latin1_General_100_CI_AS_SC_UTF8 AS varchar(max)) AS varbinary(max));
    DECLARE @hash varbinary(16) = SUBSTRING(HASHBYTES('SHA1', @ns_be + @name_bytes), 1, 16);
    SET @hash = SUBSTRING(@hash, 1, 6)
        + CAST((CAST(SUBSTRING(@hash, 7, 1) AS tinyint) & 0x0F) | 0x50 AS binary(1))
        + SUBSTRING(@hash, 8, 1)
        + CAST((CAST(SUBSTRING(@hash, 9, 1) AS tinyint) & 0x3F) | 0x80 AS binary(1))
        + SUBSTRING(@hash, 10, 7);
    RETURN CAST(
        SUBSTRING(@hash, 4, 1) + SUBSTRING(@hash, 3, 1) + SUBSTRING(@hash, 2, 1) + SUBSTRING(@hash, 1, 1)
        + SUBSTRING(@hash, 6, 1) + SUBSTRING(@hash, 5, 1)
        + SUBSTRING(@hash, 8, 1) + SUBSTRING(@hash, 7, 1)
        + SUBSTRING(@hash, 9, 8)
        AS uniqueidentifier);
END;"#,
            self.qualify_name(schema, "uuidv5")
        )
    }

    fn render_binary_literal(&self, value: &[u8]) -> String {
        format!("0x{}", hex::encode_upper(value))
    }

    fn render_boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn render_string_literal(&self, value: &str) -> String {
        format!("N'{}'", escape_string_literal(value))
    }
}
