//! PostgreSQL dialect.

use super::{
    check_foreign_key_arity, require_columns, DdlPattern, DialectRules, ForeignKeyDef,
    PgsqlRules, SqlDialect, SqlDialectKind,
};
use crate::core::identifier::{escape_string_literal, quote_pg};
use crate::error::Result;
use crate::model::{DbColumnName, DbSchemaName, DbTableName};

/// PostgreSQL dialect.
///
/// Catalog guards for constraints use `DO $$` blocks probing `pg_constraint`;
/// everything else uses native `IF NOT EXISTS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgsqlDialect {
    rules: PgsqlRules,
}

impl PgsqlDialect {
    pub fn new(rules: PgsqlRules) -> Self {
        Self { rules }
    }

    /// Wrap an `ALTER TABLE` in a guard on `pg_constraint`.
    fn guarded_constraint(&self, table: &DbTableName, name: &str, alter_lines: &[String]) -> String {
        let mut sql = String::new();
        sql.push_str("DO $$\n");
        sql.push_str("BEGIN\n");
        sql.push_str("    IF NOT EXISTS (\n");
        sql.push_str("        SELECT 1 FROM pg_constraint\n");
        sql.push_str(&format!(
            "        WHERE conname = '{}' AND conrelid = to_regclass('{}')\n",
            escape_string_literal(name),
            escape_string_literal(&self.qualify_table(table))
        ));
        sql.push_str("    )\n");
        sql.push_str("    THEN\n");
        for line in alter_lines {
            sql.push_str("        ");
            sql.push_str(line);
            sql.push('\n');
        }
        sql.push_str("    END IF;\n");
        sql.push_str("END $$;");
        sql
    }
}

impl SqlDialect for PgsqlDialect {
    fn kind(&self) -> SqlDialectKind {
        SqlDialectKind::Pgsql
    }

    fn rules(&self) -> &dyn DialectRules {
        &self.rules
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_pg(name)
    }

    fn document_id_column_type(&self) -> &'static str {
        "bigint"
    }

    fn ordinal_column_type(&self) -> &'static str {
        "integer"
    }

    fn smallint_column_type(&self) -> &'static str {
        "smallint"
    }

    fn uuid_column_type(&self) -> &'static str {
        "uuid"
    }

    fn json_column_type(&self) -> &'static str {
        "jsonb"
    }

    fn identity_bigint_column_type(&self) -> &'static str {
        "bigint GENERATED ALWAYS AS IDENTITY"
    }

    fn current_timestamp_default_expression(&self) -> &'static str {
        "now()"
    }

    fn render_binary_column_type(&self, _length: usize) -> String {
        // bytea has no length; the length is enforced by a check constraint.
        "bytea".to_string()
    }

    fn render_sequence_default_expression(&self, schema: &DbSchemaName, sequence: &str) -> String {
        format!(
            "nextval('{}')",
            escape_string_literal(&self.qualify_name(schema, sequence))
        )
    }

    fn trigger_creation_pattern(&self) -> DdlPattern {
        DdlPattern::DropThenCreate
    }

    fn function_creation_pattern(&self) -> DdlPattern {
        DdlPattern::CreateOrReplace
    }

    fn view_creation_pattern(&self) -> DdlPattern {
        DdlPattern::CreateOrReplace
    }

    fn create_schema_if_not_exists(&self, schema: &DbSchemaName) -> String {
        format!(
            "CREATE SCHEMA IF NOT EXISTS {};",
            self.quote_identifier(schema.as_str())
        )
    }

    fn create_table_header(&self, table: &DbTableName) -> String {
        format!("CREATE TABLE IF NOT EXISTS {}", self.qualify_table(table))
    }

    fn drop_trigger_if_exists(&self, table: &DbTableName, trigger_name: &str) -> String {
        format!(
            "DROP TRIGGER IF EXISTS {} ON {};",
            self.quote_identifier(trigger_name),
            self.qualify_table(table)
        )
    }

    fn create_sequence_if_not_exists(
        &self,
        schema: &DbSchemaName,
        sequence: &str,
        start_with: i64,
    ) -> String {
        format!(
            "CREATE SEQUENCE IF NOT EXISTS {} START WITH {};",
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
        // Index names are schema-scoped and take the table's schema; they are
        // never qualified in CREATE INDEX.
        Ok(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {} ({});",
            if is_unique { "UNIQUE " } else { "" },
            self.quote_identifier(index_name),
            self.qualify_table(table),
            self.column_list(columns)
        ))
    }

    fn add_foreign_key_constraint(&self, fk: &ForeignKeyDef<'_>) -> Result<String> {
        check_foreign_key_arity(fk)?;
        let lines = vec![
            format!("ALTER TABLE {}", self.qualify_table(fk.table)),
            format!("ADD CONSTRAINT {}", self.quote_identifier(fk.name)),
            format!("FOREIGN KEY ({})", self.column_list(fk.columns)),
            format!(
                "REFERENCES {} ({})",
                self.qualify_table(fk.target_table),
                self.column_list(fk.target_columns)
            ),
            format!("ON DELETE {}", self.render_referential_action(fk.on_delete)),
            format!("ON UPDATE {};", self.render_referential_action(fk.on_update)),
        ];
        Ok(self.guarded_constraint(fk.table, fk.name, &lines))
    }

    fn add_unique_constraint(
        &self,
        table: &DbTableName,
        name: &str,
        columns: &[DbColumnName],
    ) -> Result<String> {
        require_columns(columns, &format!("unique constraint '{}'", name))?;
        let lines = vec![
            format!("ALTER TABLE {}", self.qualify_table(table)),
            format!(
                "ADD CONSTRAINT {} UNIQUE ({});",
                self.quote_identifier(name),
                self.column_list(columns)
            ),
        ];
        Ok(self.guarded_constraint(table, name, &lines))
    }

    fn add_check_constraint(&self, table: &DbTableName, name: &str, expression: &str) -> String {
        let lines = vec![
            format!("ALTER TABLE {}", self.qualify_table(table)),
            format!(
                "ADD CONSTRAINT {} CHECK ({});",
                self.quote_identifier(name),
                expression
            ),
        ];
        self.guarded_constraint(table, name, &lines)
    }

    fn render_column_definition_with_named_default(
        &self,
        column: &DbColumnName,
        sql_type: &str,
        is_nullable: bool,
        _constraint_name: &str,
        default_expression: &str,
    ) -> String {
        // PostgreSQL column defaults are not named constraints.
        self.render_column_definition(column, sql_type, is_nullable, Some(default_expression))
    }

    fn render_computed_column_definition(
        &self,
        column: &DbColumnName,
        sql_type: &str,
        canonical: &DbColumnName,
        presence: Option<&DbColumnName>,
    ) -> String {
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
            "{} {} GENERATED ALWAYS AS ({}) STORED",
            self.quote_identifier(column.as_str()),
            sql_type,
            expression
        )
    }

    fn render_named_primary_key_clause(
        &self,
        name: &str,
        columns: &[DbColumnName],
        _clustered: bool,
    ) -> Result<String> {
        Ok(format!(
            "CONSTRAINT {} {}",
            self.quote_identifier(name),
            self.render_primary_key_clause(columns)?
        ))
    }

    fn create_extension_if_not_exists(&self, name: &str) -> Option<String> {
        Some(format!(
            "CREATE EXTENSION IF NOT EXISTS {};",
            self.quote_identifier(name)
        ))
    }

    fn create_uuidv5_function(&self, schema: &DbSchemaName) -> String {
        // uuid text is already big-endian, so only the version and variant
        // bits need adjusting after hashing.
        format!(
            r#"CREATE OR REPLACE FUNCTION {}(namespace_uuid uuid, name_text text)
RETURNS uuid
LANGUAGE plpgsql
IMMUTABLE STRICT PARALLEL SAFE
AS $$
DECLARE hash bytea;
BEGIN
    hash := digest(decode(replace(namespace_uuid::text, '-', ''), 'hex') || convert_to(name_text, 'UTF8'), 'sha1');
    hash := substring(hash from 1 for 16);
    hash := set_byte(hash, 6, (get_byte(hash, 6) & x'0f'::int) | x'50'::int);
    hash := set_byte(hash, 8, (get_byte(hash, 8) & x'3f'::int) | x'80'::int);
    RETURN encode(hash, 'hex')::uuid;
END;
$$;"#,
            self.qualify_name(schema, "uuidv5")
        )
    }

    fn render_binary_literal(&self, value: &[u8]) -> String {
        format!("'\\x{}'::bytea", hex::encode_upper(value))
    }

    fn render_boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "true"
        } else {
            "false"
        }
    }

    fn render_string_literal(&self, value: &str) -> String {
        format!("'{}'", escape_string_literal(value))
    }
}
