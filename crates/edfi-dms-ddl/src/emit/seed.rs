//! Phase 7: seed data for the effective-schema contract.
//!
//! Order:
//! 1. Preflight: abort when the database holds a different schema hash
//! 2. `ResourceKey` inserts (ascending id) and full-table validation
//! 3. `EffectiveSchema` singleton insert
//! 4. `SchemaComponent` inserts (endpoint order) and validation
//!
//! The singleton precedes the components because
//! `FK_SchemaComponent_EffectiveSchemaHash` references it.

use super::{dms_table, write_phase_header};
use crate::dialect::{Dialect, SqlDialect, SqlDialectKind};
use crate::error::Result;
use crate::model::{DbTableName, EffectiveSchemaInfo, ResourceKeyEntry, SchemaComponentInfo};
use crate::writer::SqlWriter;
use tracing::{debug, info};

/// Count-and-content check of a seeded table against the expected rows.
struct TableCheck {
    table: DbTableName,
    /// Human-readable table name in error messages.
    label: &'static str,
    alias: &'static str,
    variable_prefix: &'static str,
    /// Restricts the check to rows with `column = literal`.
    scope: Option<(&'static str, String)>,
    columns: &'static [&'static str],
    /// Rendered `(v1, v2, ...)` tuples.
    rows: Vec<String>,
}

/// Emits guarded, self-validating seed DML.
#[derive(Debug, Clone, Copy)]
pub struct SeedDmlEmitter {
    dialect: Dialect,
}

impl SeedDmlEmitter {
    pub fn new(dialect: impl Into<Dialect>) -> Self {
        Self {
            dialect: dialect.into(),
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Render the seed script for an effective schema.
    pub fn emit(&self, effective_schema: &EffectiveSchemaInfo) -> Result<String> {
        effective_schema.validate()?;

        let mut writer = SqlWriter::new(&self.dialect);
        write_phase_header(&mut writer, "Phase 7: Seed Data (insert-if-missing + validation)");

        let resource_keys = &effective_schema.resource_keys_in_id_order;
        let components = &effective_schema.schema_components_in_endpoint_order;
        debug!(
            resource_keys = resource_keys.len(),
            schema_components = components.len(),
            "Emitting seed data"
        );

        self.emit_preflight(&mut writer, &effective_schema.effective_schema_hash);
        self.emit_resource_key_inserts(&mut writer, resource_keys);
        self.emit_check(&mut writer, &self.resource_key_check(resource_keys));
        self.emit_effective_schema_insert(&mut writer, effective_schema);
        self.emit_schema_component_inserts(
            &mut writer,
            &effective_schema.effective_schema_hash,
            components,
        );
        self.emit_check(
            &mut writer,
            &self.schema_component_check(&effective_schema.effective_schema_hash, components),
        );

        let sql = writer.into_sql();
        info!(dialect = %self.dialect.kind(), bytes = sql.len(), "Seed DML emitted");
        Ok(sql)
    }

    fn q(&self, id: &str) -> String {
        self.dialect.quote_identifier(id)
    }

    fn quoted_list(&self, columns: &[&str]) -> String {
        columns
            .iter()
            .map(|c| self.q(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // =========================================================================
    // Preflight
    // =========================================================================

    fn emit_preflight(&self, writer: &mut SqlWriter<'_>, effective_schema_hash: &str) {
        let table = self.dialect.qualify_table(&dms_table("EffectiveSchema"));
        let expected = self.dialect.render_string_literal(effective_schema_hash);
        let hash_column = self.q("EffectiveSchemaHash");
        let singleton = self.q("EffectiveSchemaSingletonId");

        writer.append_line(
            "-- Preflight: fail fast if database is provisioned for a different schema hash",
        );

        match self.dialect.kind() {
            SqlDialectKind::Pgsql => {
                writer.append_line("DO $$");
                writer.append_line("DECLARE");
                writer.indent().append_line("_stored_hash text;");
                writer.append_line("BEGIN");
                {
                    let mut body = writer.indent();
                    body.append_line(&format!(
                        "SELECT {} INTO _stored_hash FROM {} WHERE {} = 1;",
                        hash_column, table, singleton
                    ));
                    body.append_line(&format!(
                        "IF _stored_hash IS NOT NULL AND _stored_hash <> {} THEN",
                        expected
                    ));
                    body.indent().append_line(&format!(
                        "RAISE EXCEPTION 'EffectiveSchemaHash mismatch: database is provisioned for schema hash % (expected: %)', _stored_hash, {};",
                        expected
                    ));
                    body.append_line("END IF;");
                }
                writer.append_line("END $$;");
            }
            SqlDialectKind::Mssql => {
                writer.append_line("DECLARE @stored_hash nvarchar(64);");
                writer.append_line(&format!(
                    "SELECT @stored_hash = {} FROM {} WHERE {} = 1;",
                    hash_column, table, singleton
                ));
                writer.append_line(&format!(
                    "IF @stored_hash IS NOT NULL AND @stored_hash <> {}",
                    expected
                ));
                writer.append_line("BEGIN");
                {
                    let mut body = writer.indent();
                    body.append_line(&format!(
                        "DECLARE @hash_msg nvarchar(400) = CONCAT(N'EffectiveSchemaHash mismatch: database is provisioned for schema hash ', @stored_hash, N' (expected: ', {}, N')');",
                        expected
                    ));
                    body.append_line("THROW 50000, @hash_msg, 1;");
                }
                writer.append_line("END");
            }
        }
        writer.new_line();
    }

    // =========================================================================
    // Inserts
    // =========================================================================

    /// One idempotent insert keyed on `key_columns`.
    fn write_guarded_insert(
        &self,
        writer: &mut SqlWriter<'_>,
        table: &DbTableName,
        columns: &[&str],
        values: &[String],
        key: &[(&str, String)],
    ) {
        let table = self.dialect.qualify_table(table);
        let insert = format!("INSERT INTO {} ({})", table, self.quoted_list(columns));
        let values = values.join(", ");

        match self.dialect.kind() {
            SqlDialectKind::Pgsql => {
                let key_columns: Vec<&str> = key.iter().map(|(c, _)| *c).collect();
                writer.append_line(&insert);
                writer.append_line(&format!("VALUES ({})", values));
                writer.append_line(&format!(
                    "ON CONFLICT ({}) DO NOTHING;",
                    self.quoted_list(&key_columns)
                ));
            }
            SqlDialectKind::Mssql => {
                let predicate = key
                    .iter()
                    .map(|(c, v)| format!("{} = {}", self.q(c), v))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                writer.append_line(&format!(
                    "IF NOT EXISTS (SELECT 1 FROM {} WHERE {})",
                    table, predicate
                ));
                let mut body = writer.indent();
                body.append_line(&insert);
                body.append_line(&format!("VALUES ({});", values));
            }
        }
    }

    fn emit_resource_key_inserts(&self, writer: &mut SqlWriter<'_>, resource_keys: &[ResourceKeyEntry]) {
        if resource_keys.is_empty() {
            return;
        }

        let table = dms_table("ResourceKey");
        writer.append_line("-- ResourceKey seed inserts (insert-if-missing)");
        for rk in resource_keys {
            let id = self.dialect.render_smallint_literal(rk.resource_key_id);
            self.write_guarded_insert(
                writer,
                &table,
                &["ResourceKeyId", "ProjectName", "ResourceName", "ResourceVersion"],
                &[
                    id.clone(),
                    self.dialect.render_string_literal(&rk.resource.project_name),
                    self.dialect.render_string_literal(&rk.resource.resource_name),
                    self.dialect.render_string_literal(&rk.resource_version),
                ],
                &[("ResourceKeyId", id)],
            );
        }
        writer.new_line();
    }

    fn emit_effective_schema_insert(&self, writer: &mut SqlWriter<'_>, info: &EffectiveSchemaInfo) {
        writer.append_line("-- EffectiveSchema singleton insert-if-missing");
        self.write_guarded_insert(
            writer,
            &dms_table("EffectiveSchema"),
            &[
                "EffectiveSchemaSingletonId",
                "ApiSchemaFormatVersion",
                "EffectiveSchemaHash",
                "ResourceKeyCount",
                "ResourceKeySeedHash",
            ],
            &[
                self.dialect.render_smallint_literal(1),
                self.dialect.render_string_literal(&info.api_schema_format_version),
                self.dialect.render_string_literal(&info.effective_schema_hash),
                self.dialect.render_smallint_literal(info.resource_key_count),
                self.dialect.render_binary_literal(&info.resource_key_seed_hash),
            ],
            &[("EffectiveSchemaSingletonId", self.dialect.render_smallint_literal(1))],
        );
        writer.new_line();
    }

    fn emit_schema_component_inserts(
        &self,
        writer: &mut SqlWriter<'_>,
        effective_schema_hash: &str,
        components: &[SchemaComponentInfo],
    ) {
        if components.is_empty() {
            return;
        }

        let table = dms_table("SchemaComponent");
        let hash = self.dialect.render_string_literal(effective_schema_hash);
        writer.append_line("-- SchemaComponent seed inserts (insert-if-missing)");
        for sc in components {
            let endpoint = self.dialect.render_string_literal(&sc.project_endpoint_name);
            self.write_guarded_insert(
                writer,
                &table,
                &[
                    "EffectiveSchemaHash",
                    "ProjectEndpointName",
                    "ProjectName",
                    "ProjectVersion",
                    "IsExtensionProject",
                ],
                &[
                    hash.clone(),
                    endpoint.clone(),
                    self.dialect.render_string_literal(&sc.project_name),
                    self.dialect.render_string_literal(&sc.project_version),
                    self.dialect
                        .render_boolean_literal(sc.is_extension_project)
                        .to_string(),
                ],
                &[("EffectiveSchemaHash", hash.clone()), ("ProjectEndpointName", endpoint)],
            );
        }
        writer.new_line();
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn resource_key_check(&self, resource_keys: &[ResourceKeyEntry]) -> TableCheck {
        // VALUES infers integer for bare numbers in PostgreSQL.
        let id_cast = match self.dialect.kind() {
            SqlDialectKind::Pgsql => "::smallint",
            SqlDialectKind::Mssql => "",
        };
        TableCheck {
            table: dms_table("ResourceKey"),
            label: "dms.ResourceKey",
            alias: "rk",
            variable_prefix: "rk_",
            scope: None,
            columns: &["ResourceKeyId", "ProjectName", "ResourceName", "ResourceVersion"],
            rows: resource_keys
                .iter()
                .map(|rk| {
                    format!(
                        "({}{}, {}, {}, {})",
                        self.dialect.render_smallint_literal(rk.resource_key_id),
                        id_cast,
                        self.dialect.render_string_literal(&rk.resource.project_name),
                        self.dialect.render_string_literal(&rk.resource.resource_name),
                        self.dialect.render_string_literal(&rk.resource_version)
                    )
                })
                .collect(),
        }
    }

    fn schema_component_check(
        &self,
        effective_schema_hash: &str,
        components: &[SchemaComponentInfo],
    ) -> TableCheck {
        TableCheck {
            table: dms_table("SchemaComponent"),
            label: "dms.SchemaComponent",
            alias: "sc",
            variable_prefix: "sc_",
            scope: Some((
                "EffectiveSchemaHash",
                self.dialect.render_string_literal(effective_schema_hash),
            )),
            columns: &["ProjectEndpointName", "ProjectName", "ProjectVersion", "IsExtensionProject"],
            rows: components
                .iter()
                .map(|sc| {
                    format!(
                        "({}, {}, {}, {})",
                        self.dialect.render_string_literal(&sc.project_endpoint_name),
                        self.dialect.render_string_literal(&sc.project_name),
                        self.dialect.render_string_literal(&sc.project_version),
                        self.dialect.render_boolean_literal(sc.is_extension_project)
                    )
                })
                .collect(),
        }
    }

    /// Count check, then (when rows are expected) a content check that counts
    /// stored rows with no exact match in the expected tuple list.
    fn emit_check(&self, writer: &mut SqlWriter<'_>, check: &TableCheck) {
        let table = self.dialect.qualify_table(&check.table);
        let expected_count = self
            .dialect
            .render_integer_literal(i32::try_from(check.rows.len()).unwrap_or(i32::MAX));
        let scope_filter = check
            .scope
            .as_ref()
            .map(|(column, literal)| format!(" WHERE {} = {}", self.q(column), literal))
            .unwrap_or_default();

        writer.append_line(&format!(
            "-- {} validation (count + content)",
            check.label.trim_start_matches("dms.")
        ));

        match self.dialect.kind() {
            SqlDialectKind::Pgsql => {
                let actual = format!("_{}actual_count", check.variable_prefix);
                let mismatched = format!("_{}mismatched_count", check.variable_prefix);

                writer.append_line("DO $$");
                writer.append_line("DECLARE");
                {
                    let mut vars = writer.indent();
                    vars.append_line(&format!("{} integer;", actual));
                    if !check.rows.is_empty() {
                        vars.append_line(&format!("{} integer;", mismatched));
                    }
                }
                writer.append_line("BEGIN");
                {
                    let mut body = writer.indent();
                    body.append_line(&format!(
                        "SELECT COUNT(*) INTO {} FROM {}{};",
                        actual, table, scope_filter
                    ));
                    body.append_line(&format!("IF {} <> {} THEN", actual, expected_count));
                    body.indent().append_line(&format!(
                        "RAISE EXCEPTION '{} count mismatch: expected {}, found %', {};",
                        check.label, expected_count, actual
                    ));
                    body.append_line("END IF;");

                    if !check.rows.is_empty() {
                        body.new_line();
                        body.append_line(&format!("SELECT COUNT(*) INTO {}", mismatched));
                        self.write_mismatch_query(&mut body, check, &table);
                        body.append_line(&format!("IF {} > 0 THEN", mismatched));
                        body.indent().append_line(&format!(
                            "RAISE EXCEPTION '{} contents mismatch: % unexpected or modified rows', {};",
                            check.label, mismatched
                        ));
                        body.append_line("END IF;");
                    }
                }
                writer.append_line("END $$;");
            }
            SqlDialectKind::Mssql => {
                let prefix = check.variable_prefix;
                writer.append_line(&format!("DECLARE @{}actual_count integer;", prefix));
                writer.append_line(&format!(
                    "SELECT @{}actual_count = COUNT(*) FROM {}{};",
                    prefix, table, scope_filter
                ));
                writer.append_line(&format!("IF @{}actual_count <> {}", prefix, expected_count));
                writer.append_line("BEGIN");
                {
                    let mut body = writer.indent();
                    body.append_line(&format!(
                        "DECLARE @{0}count_msg nvarchar(200) = CONCAT(N'{1} count mismatch: expected {2}, found ', CAST(@{0}actual_count AS nvarchar(10)));",
                        prefix, check.label, expected_count
                    ));
                    body.append_line(&format!("THROW 50000, @{}count_msg, 1;", prefix));
                }
                writer.append_line("END");

                if !check.rows.is_empty() {
                    writer.new_line();
                    writer.append_line(&format!("DECLARE @{}mismatched_count integer;", prefix));
                    writer.append_line(&format!("SELECT @{}mismatched_count = COUNT(*)", prefix));
                    self.write_mismatch_query(writer, check, &table);
                    writer.append_line(&format!("IF @{}mismatched_count > 0", prefix));
                    writer.append_line("BEGIN");
                    {
                        let mut body = writer.indent();
                        body.append_line(&format!(
                            "DECLARE @{0}content_msg nvarchar(200) = CONCAT(N'{1} contents mismatch: ', CAST(@{0}mismatched_count AS nvarchar(10)), N' unexpected or modified rows');",
                            prefix, check.label
                        ));
                        body.append_line(&format!("THROW 50000, @{}content_msg, 1;", prefix));
                    }
                    writer.append_line("END");
                }
            }
        }
        writer.new_line();
    }

    /// `FROM t alias [WHERE scope] AND NOT EXISTS (SELECT 1 FROM (VALUES ...) ...);`
    fn write_mismatch_query(&self, writer: &mut SqlWriter<'_>, check: &TableCheck, table: &str) {
        let alias = check.alias;
        writer.append_line(&format!("FROM {} {}", table, alias));
        match &check.scope {
            Some((column, literal)) => {
                writer.append_line(&format!("WHERE {}.{} = {}", alias, self.q(column), literal));
                writer.append_line("AND NOT EXISTS (");
            }
            None => {
                writer.append_line("WHERE NOT EXISTS (");
            }
        }
        {
            let mut sub = writer.indent();
            sub.append_line("SELECT 1 FROM (VALUES");
            {
                let mut rows = sub.indent();
                let last = check.rows.len().saturating_sub(1);
                for (i, row) in check.rows.iter().enumerate() {
                    rows.append(row);
                    rows.append_line(if i < last { "," } else { "" });
                }
            }
            sub.append_line(&format!(
                ") AS expected({})",
                self.quoted_list(check.columns)
            ));
            for (i, column) in check.columns.iter().enumerate() {
                let keyword = if i == 0 { "WHERE" } else { "AND" };
                sub.append_line(&format!(
                    "{} expected.{} = {}.{}",
                    keyword,
                    self.q(column),
                    alias,
                    self.q(column)
                ));
            }
        }
        writer.append_line(");");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_effective_schema;

    fn emit(kind: SqlDialectKind, info: &EffectiveSchemaInfo) -> String {
        SeedDmlEmitter::new(kind).emit(info).unwrap()
    }

    fn empty_keys() -> EffectiveSchemaInfo {
        let mut info = sample_effective_schema();
        info.resource_keys_in_id_order.clear();
        info.resource_key_count = 0;
        info
    }

    // =========================================================================
    // Determinism and ordering
    // =========================================================================

    #[test]
    fn test_emit_is_deterministic() {
        let info = sample_effective_schema();
        for kind in [SqlDialectKind::Pgsql, SqlDialectKind::Mssql] {
            assert_eq!(emit(kind, &info), emit(kind, &info));
        }
    }

    #[test]
    fn test_resource_keys_in_id_order() {
        let sql = emit(SqlDialectKind::Pgsql, &sample_effective_schema());
        let first = sql.find("VALUES (1, 'Ed-Fi', 'EducationOrganization', '5.1.0')").unwrap();
        let second = sql.find("VALUES (2, 'Ed-Fi', 'LocalEducationAgency', '5.1.0')").unwrap();
        let third = sql.find("VALUES (3, 'Ed-Fi', 'School', '5.1.0')").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_section_order() {
        for kind in [SqlDialectKind::Pgsql, SqlDialectKind::Mssql] {
            let sql = emit(kind, &sample_effective_schema());
            let markers = [
                "-- Preflight",
                "-- ResourceKey seed inserts",
                "-- ResourceKey validation",
                "-- EffectiveSchema singleton insert-if-missing",
                "-- SchemaComponent seed inserts",
                "-- SchemaComponent validation",
            ];
            let positions: Vec<usize> = markers.iter().map(|m| sql.find(m).unwrap()).collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);
        }
    }

    // =========================================================================
    // Dialect forms
    // =========================================================================

    #[test]
    fn test_pgsql_forms() {
        let sql = emit(SqlDialectKind::Pgsql, &sample_effective_schema());
        assert!(sql.contains("ON CONFLICT (\"ResourceKeyId\") DO NOTHING;"));
        assert!(sql.contains("ON CONFLICT (\"EffectiveSchemaHash\", \"ProjectEndpointName\") DO NOTHING;"));
        assert!(sql.contains("RAISE EXCEPTION 'EffectiveSchemaHash mismatch"));
        assert!(sql.contains("(1::smallint, 'Ed-Fi', 'EducationOrganization', '5.1.0'),"));
        assert!(sql.contains("('ed-fi', 'Ed-Fi', '5.1.0', false)"));
        assert!(!sql.contains("THROW"));
    }

    #[test]
    fn test_mssql_forms() {
        let sql = emit(SqlDialectKind::Mssql, &sample_effective_schema());
        assert!(sql.contains("IF NOT EXISTS (SELECT 1 FROM [dms].[ResourceKey] WHERE [ResourceKeyId] = 3)\n    INSERT INTO [dms].[ResourceKey]"));
        assert!(sql.contains("THROW 50000, @hash_msg, 1;"));
        assert!(sql.contains("(N'ed-fi', N'Ed-Fi', N'5.1.0', 0)"));
        assert!(!sql.contains("RAISE EXCEPTION"));
    }

    #[test]
    fn test_seed_hash_binary_literal() {
        let mut info = sample_effective_schema();
        let mut hash = vec![0xAB];
        hash.extend(std::iter::repeat(0x00).take(30));
        hash.push(0x89);
        info.resource_key_seed_hash = hash;
        let expected_hex = format!("AB{}89", "00".repeat(30));

        let pg = emit(SqlDialectKind::Pgsql, &info);
        assert!(pg.contains(&format!("'\\x{}'::bytea", expected_hex)));
        let ms = emit(SqlDialectKind::Mssql, &info);
        assert!(ms.contains(&format!("0x{})", expected_hex)));
    }

    #[test]
    fn test_preflight_names_both_hashes() {
        let info = sample_effective_schema();
        let pg = emit(SqlDialectKind::Pgsql, &info);
        assert!(pg.contains(&format!(
            "provisioned for schema hash % (expected: %)', _stored_hash, '{}';",
            info.effective_schema_hash
        )));
        let ms = emit(SqlDialectKind::Mssql, &info);
        assert!(ms.contains("@stored_hash, N' (expected: '"));
    }

    // =========================================================================
    // Edge cases
    // =========================================================================

    #[test]
    fn test_zero_resource_keys() {
        for kind in [SqlDialectKind::Pgsql, SqlDialectKind::Mssql] {
            let sql = emit(kind, &empty_keys());
            assert!(!sql.contains("-- ResourceKey seed inserts"));
            assert!(sql.contains("ResourceKey count mismatch: expected 0"));
            assert!(!sql.contains("ResourceKey contents mismatch"));
            assert!(sql.contains("-- EffectiveSchema singleton insert-if-missing"));
        }
    }

    #[test]
    fn test_single_component_still_validated() {
        let sql = emit(SqlDialectKind::Mssql, &sample_effective_schema());
        assert_eq!(sql.matches("INSERT INTO [dms].[SchemaComponent]").count(), 1);
        assert!(sql.contains("dms.SchemaComponent contents mismatch"));
    }

    #[test]
    fn test_invalid_contract_rejected() {
        let mut info = sample_effective_schema();
        info.resource_key_seed_hash.truncate(4);
        assert!(SeedDmlEmitter::new(SqlDialectKind::Pgsql).emit(&info).is_err());
    }
}
