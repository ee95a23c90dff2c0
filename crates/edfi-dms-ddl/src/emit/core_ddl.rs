//! Core `dms.*` schema DDL.
//!
//! Six strictly ordered phases:
//! 1. Schemas
//! 2. Sequences
//! 3. Tables (PK/UNIQUE/CHECK only, alphabetical)
//! 4. Foreign keys
//! 5. Indexes
//! 6. Triggers (plus the `uuidv5` function the relational triggers call)
//!
//! Every statement is guarded, so the script can be re-run against an
//! existing database.

use super::{dms_table, write_phase_header, write_table, CHANGE_VERSION_SEQUENCE, DMS_SCHEMA};
use crate::dialect::{Dialect, ForeignKeyDef, SqlDialect, SqlDialectKind};
use crate::error::Result;
use crate::model::{DbColumnName, DbSchemaName, DbTableName, ReferentialAction};
use crate::writer::SqlWriter;
use tracing::{debug, info};

const JOURNAL_TRIGGER: &str = "TR_Document_Journal";
const JOURNAL_FUNCTION: &str = "TF_Document_Journal";

fn col(name: &'static str) -> DbColumnName {
    DbColumnName::from_static(name)
}

fn cols(names: &[&'static str]) -> Vec<DbColumnName> {
    names.iter().map(|n| col(n)).collect()
}

/// Emits the fixed core storage schema.
#[derive(Debug, Clone, Copy)]
pub struct CoreDdlEmitter {
    dialect: Dialect,
}

impl CoreDdlEmitter {
    pub fn new(dialect: impl Into<Dialect>) -> Self {
        Self {
            dialect: dialect.into(),
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Render the complete core script.
    pub fn emit(&self) -> Result<String> {
        let mut writer = SqlWriter::new(&self.dialect);

        self.emit_schemas(&mut writer);
        self.emit_sequences(&mut writer);
        self.emit_tables(&mut writer)?;
        self.emit_foreign_keys(&mut writer)?;
        self.emit_indexes(&mut writer)?;
        self.emit_triggers(&mut writer);

        let sql = writer.into_sql();
        info!(dialect = %self.dialect.kind(), bytes = sql.len(), "Core DDL emitted");
        Ok(sql)
    }

    fn dms(&self) -> DbSchemaName {
        DbSchemaName::from_static(DMS_SCHEMA)
    }

    fn string_type(&self, max_length: u32) -> String {
        format!(
            "{}({})",
            self.dialect.rules().scalar_type_defaults().string_type,
            max_length
        )
    }

    fn column(&self, name: &'static str, sql_type: &str, nullable: bool) -> String {
        self.dialect
            .render_column_definition(&col(name), sql_type, nullable, None)
    }

    fn column_with_default(
        &self,
        name: &'static str,
        sql_type: &str,
        constraint: &str,
        default_expression: &str,
    ) -> String {
        self.dialect.render_column_definition_with_named_default(
            &col(name),
            sql_type,
            false,
            constraint,
            default_expression,
        )
    }

    fn timestamp_column(&self, name: &'static str, constraint: &str) -> String {
        let defaults = self.dialect.rules().scalar_type_defaults();
        self.column_with_default(
            name,
            defaults.datetime_type,
            constraint,
            self.dialect.current_timestamp_default_expression(),
        )
    }

    fn sequence_default(&self) -> String {
        self.dialect
            .render_sequence_default_expression(&self.dms(), CHANGE_VERSION_SEQUENCE)
    }

    fn primary_key(&self, name: &str, columns: &[&'static str]) -> Result<String> {
        self.dialect
            .render_named_primary_key_clause(name, &cols(columns), true)
    }

    // =========================================================================
    // Phase 1: Schemas
    // =========================================================================

    fn emit_schemas(&self, writer: &mut SqlWriter<'_>) {
        write_phase_header(writer, "Phase 1: Schemas");
        writer.append_line(&self.dialect.create_schema_if_not_exists(&self.dms()));
        writer.new_line();
    }

    // =========================================================================
    // Phase 2: Sequences
    // =========================================================================

    fn emit_sequences(&self, writer: &mut SqlWriter<'_>) {
        write_phase_header(writer, "Phase 2: Sequences");
        writer.append_line(&self.dialect.create_sequence_if_not_exists(
            &self.dms(),
            CHANGE_VERSION_SEQUENCE,
            1,
        ));
        writer.new_line();
    }

    // =========================================================================
    // Phase 3: Tables
    // =========================================================================

    fn emit_tables(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        write_phase_header(writer, "Phase 3: Tables (PK/UNIQUE/CHECK only, no cross-table FKs)");
        debug!("Emitting core tables");

        self.emit_descriptor_table(writer)?;
        self.emit_document_table(writer)?;
        self.emit_document_cache_table(writer)?;
        self.emit_document_change_event_table(writer)?;
        self.emit_effective_schema_table(writer)?;
        self.emit_referential_identity_table(writer)?;
        self.emit_resource_key_table(writer)?;
        self.emit_schema_component_table(writer)
    }

    fn emit_descriptor_table(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        let table = dms_table("Descriptor");
        let defaults = self.dialect.rules().scalar_type_defaults();
        let lines = vec![
            self.column("DocumentId", self.dialect.document_id_column_type(), false),
            self.column("Namespace", &self.string_type(255), false),
            self.column("CodeValue", &self.string_type(50), false),
            self.column("ShortDescription", &self.string_type(75), false),
            self.column("Description", &self.string_type(1024), true),
            self.column("EffectiveBeginDate", defaults.date_type, true),
            self.column("EffectiveEndDate", defaults.date_type, true),
            self.column("Discriminator", &self.string_type(128), false),
            self.column("Uri", &self.string_type(306), false),
            self.primary_key("PK_Descriptor", &["DocumentId"])?,
        ];
        write_table(writer, &table, &lines);

        self.write_unique(writer, &table, "UX_Descriptor_Uri_Discriminator", &["Uri", "Discriminator"])
    }

    fn emit_document_table(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        let table = dms_table("Document");
        let sequence_default = self.sequence_default();
        let lines = vec![
            self.column("DocumentId", self.dialect.identity_bigint_column_type(), false),
            self.column("DocumentUuid", self.dialect.uuid_column_type(), false),
            self.column("ResourceKeyId", self.dialect.smallint_column_type(), false),
            self.column_with_default("ContentVersion", "bigint", "DF_Document_ContentVersion", &sequence_default),
            self.column_with_default("IdentityVersion", "bigint", "DF_Document_IdentityVersion", &sequence_default),
            self.timestamp_column("ContentLastModifiedAt", "DF_Document_ContentLastModifiedAt"),
            self.timestamp_column("IdentityLastModifiedAt", "DF_Document_IdentityLastModifiedAt"),
            self.timestamp_column("CreatedAt", "DF_Document_CreatedAt"),
            self.primary_key("PK_Document", &["DocumentId"])?,
        ];
        write_table(writer, &table, &lines);

        self.write_unique(writer, &table, "UX_Document_DocumentUuid", &["DocumentUuid"])
    }

    fn emit_document_cache_table(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        let table = dms_table("DocumentCache");
        let defaults = self.dialect.rules().scalar_type_defaults();
        let lines = vec![
            self.column("DocumentId", self.dialect.document_id_column_type(), false),
            self.column("DocumentUuid", self.dialect.uuid_column_type(), false),
            self.column("ProjectName", &self.string_type(256), false),
            self.column("ResourceName", &self.string_type(256), false),
            self.column("ResourceVersion", &self.string_type(32), false),
            self.column("Etag", &self.string_type(64), false),
            self.column("LastModifiedAt", defaults.datetime_type, false),
            self.column("DocumentJson", self.dialect.json_column_type(), false),
            self.timestamp_column("ComputedAt", "DF_DocumentCache_ComputedAt"),
            self.primary_key("PK_DocumentCache", &["DocumentId"])?,
        ];
        write_table(writer, &table, &lines);

        self.write_unique(writer, &table, "UX_DocumentCache_DocumentUuid", &["DocumentUuid"])?;

        let json = self.dialect.quote_identifier("DocumentJson");
        let check = match self.dialect.kind() {
            SqlDialectKind::Pgsql => self.dialect.add_check_constraint(
                &table,
                "CK_DocumentCache_JsonObject",
                &format!("jsonb_typeof({}) = 'object'", json),
            ),
            SqlDialectKind::Mssql => self.dialect.add_check_constraint(
                &table,
                "CK_DocumentCache_IsJsonObject",
                &format!("ISJSON({0}) = 1 AND LEFT(LTRIM({0}), 1) = '{{'", json),
            ),
        };
        writer.append_line(&check);
        writer.new_line();
        Ok(())
    }

    fn emit_document_change_event_table(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        let table = dms_table("DocumentChangeEvent");
        let lines = vec![
            self.column("ChangeVersion", "bigint", false),
            self.column("DocumentId", self.dialect.document_id_column_type(), false),
            self.column("ResourceKeyId", self.dialect.smallint_column_type(), false),
            self.timestamp_column("CreatedAt", "DF_DocumentChangeEvent_CreatedAt"),
            self.primary_key("PK_DocumentChangeEvent", &["ChangeVersion", "DocumentId"])?,
        ];
        write_table(writer, &table, &lines);
        Ok(())
    }

    fn emit_effective_schema_table(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        let table = dms_table("EffectiveSchema");
        let lines = vec![
            self.column("EffectiveSchemaSingletonId", self.dialect.smallint_column_type(), false),
            self.column("ApiSchemaFormatVersion", &self.string_type(64), false),
            self.column("EffectiveSchemaHash", &self.string_type(64), false),
            self.column("ResourceKeyCount", self.dialect.smallint_column_type(), false),
            self.column("ResourceKeySeedHash", &self.dialect.render_binary_column_type(32), false),
            self.timestamp_column("AppliedAt", "DF_EffectiveSchema_AppliedAt"),
            self.primary_key("PK_EffectiveSchema", &["EffectiveSchemaSingletonId"])?,
        ];
        write_table(writer, &table, &lines);

        writer.append_line(&self.dialect.add_check_constraint(
            &table,
            "CK_EffectiveSchema_Singleton",
            &format!("{} = 1", self.dialect.quote_identifier("EffectiveSchemaSingletonId")),
        ));
        writer.new_line();

        // bytea carries no length of its own.
        if self.dialect.kind() == SqlDialectKind::Pgsql {
            writer.append_line(&self.dialect.add_check_constraint(
                &table,
                "CK_EffectiveSchema_ResourceKeySeedHash_Length",
                &format!(
                    "octet_length({}) = 32",
                    self.dialect.quote_identifier("ResourceKeySeedHash")
                ),
            ));
            writer.new_line();
        }

        self.write_unique(writer, &table, "UX_EffectiveSchema_EffectiveSchemaHash", &["EffectiveSchemaHash"])
    }

    fn emit_referential_identity_table(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        let table = dms_table("ReferentialIdentity");
        let mut lines = vec![
            self.column("ReferentialId", self.dialect.uuid_column_type(), false),
            self.column("DocumentId", self.dialect.document_id_column_type(), false),
            self.column("ResourceKeyId", self.dialect.smallint_column_type(), false),
        ];

        match self.dialect.kind() {
            SqlDialectKind::Mssql => {
                // Random uuids make a poor clustering key; cluster on the document instead.
                lines.push(self.dialect.render_named_primary_key_clause(
                    "PK_ReferentialIdentity",
                    &cols(&["ReferentialId"]),
                    false,
                )?);
                lines.push(format!(
                    "CONSTRAINT {} UNIQUE CLUSTERED ({})",
                    self.dialect
                        .quote_identifier("UX_ReferentialIdentity_DocumentId_ResourceKeyId"),
                    self.dialect.column_list(&cols(&["DocumentId", "ResourceKeyId"]))
                ));
            }
            SqlDialectKind::Pgsql => {
                lines.push(self.primary_key("PK_ReferentialIdentity", &["ReferentialId"])?);
            }
        }

        write_table(writer, &table, &lines);
        Ok(())
    }

    fn emit_resource_key_table(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        let table = dms_table("ResourceKey");
        let lines = vec![
            self.column("ResourceKeyId", self.dialect.smallint_column_type(), false),
            self.column("ProjectName", &self.string_type(256), false),
            self.column("ResourceName", &self.string_type(256), false),
            self.column("ResourceVersion", &self.string_type(32), false),
            self.primary_key("PK_ResourceKey", &["ResourceKeyId"])?,
        ];
        write_table(writer, &table, &lines);

        self.write_unique(
            writer,
            &table,
            "UX_ResourceKey_ProjectName_ResourceName",
            &["ProjectName", "ResourceName"],
        )
    }

    fn emit_schema_component_table(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        let table = dms_table("SchemaComponent");
        let defaults = self.dialect.rules().scalar_type_defaults();
        let lines = vec![
            self.column("EffectiveSchemaHash", &self.string_type(64), false),
            self.column("ProjectEndpointName", &self.string_type(128), false),
            self.column("ProjectName", &self.string_type(256), false),
            self.column("ProjectVersion", &self.string_type(32), false),
            self.column("IsExtensionProject", defaults.boolean_type, false),
            self.primary_key("PK_SchemaComponent", &["EffectiveSchemaHash", "ProjectEndpointName"])?,
        ];
        write_table(writer, &table, &lines);
        Ok(())
    }

    fn write_unique(
        &self,
        writer: &mut SqlWriter<'_>,
        table: &DbTableName,
        name: &str,
        columns: &[&'static str],
    ) -> Result<()> {
        writer.append_line(&self.dialect.add_unique_constraint(table, name, &cols(columns))?);
        writer.new_line();
        Ok(())
    }

    // =========================================================================
    // Phase 4: Foreign keys
    // =========================================================================

    fn emit_foreign_keys(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        write_phase_header(writer, "Phase 4: Foreign Keys");

        // (table, constraint, column, target table, target column, on delete)
        let foreign_keys: [(&str, &str, &'static str, &str, &'static str, ReferentialAction); 8] = [
            ("Descriptor", "FK_Descriptor_Document", "DocumentId", "Document", "DocumentId", ReferentialAction::Cascade),
            ("Document", "FK_Document_ResourceKey", "ResourceKeyId", "ResourceKey", "ResourceKeyId", ReferentialAction::NoAction),
            ("DocumentCache", "FK_DocumentCache_Document", "DocumentId", "Document", "DocumentId", ReferentialAction::Cascade),
            ("DocumentChangeEvent", "FK_DocumentChangeEvent_Document", "DocumentId", "Document", "DocumentId", ReferentialAction::Cascade),
            ("DocumentChangeEvent", "FK_DocumentChangeEvent_ResourceKey", "ResourceKeyId", "ResourceKey", "ResourceKeyId", ReferentialAction::NoAction),
            ("ReferentialIdentity", "FK_ReferentialIdentity_Document", "DocumentId", "Document", "DocumentId", ReferentialAction::Cascade),
            ("ReferentialIdentity", "FK_ReferentialIdentity_ResourceKey", "ResourceKeyId", "ResourceKey", "ResourceKeyId", ReferentialAction::NoAction),
            ("SchemaComponent", "FK_SchemaComponent_EffectiveSchemaHash", "EffectiveSchemaHash", "EffectiveSchema", "EffectiveSchemaHash", ReferentialAction::Cascade),
        ];

        for (table, name, column, target, target_column, on_delete) in foreign_keys {
            let table = DbTableName::new(self.dms(), table)?;
            let target_table = DbTableName::new(self.dms(), target)?;
            let columns = [col(column)];
            let target_columns = [col(target_column)];
            writer.append_line(&self.dialect.add_foreign_key_constraint(&ForeignKeyDef {
                table: &table,
                name,
                columns: &columns,
                target_table: &target_table,
                target_columns: &target_columns,
                on_delete,
                on_update: ReferentialAction::NoAction,
            })?);
            writer.new_line();
        }
        Ok(())
    }

    // =========================================================================
    // Phase 5: Indexes
    // =========================================================================

    fn emit_indexes(&self, writer: &mut SqlWriter<'_>) -> Result<()> {
        write_phase_header(writer, "Phase 5: Indexes");

        let indexes: [(&str, &str, &[&'static str]); 6] = [
            ("Descriptor", "IX_Descriptor_Uri_Discriminator", &["Uri", "Discriminator"]),
            ("Document", "IX_Document_ResourceKeyId_DocumentId", &["ResourceKeyId", "DocumentId"]),
            (
                "DocumentCache",
                "IX_DocumentCache_ProjectName_ResourceName_LastModifiedAt",
                &["ProjectName", "ResourceName", "LastModifiedAt", "DocumentId"],
            ),
            ("DocumentChangeEvent", "IX_DocumentChangeEvent_DocumentId", &["DocumentId"]),
            (
                "DocumentChangeEvent",
                "IX_DocumentChangeEvent_ResourceKeyId_ChangeVersion",
                &["ResourceKeyId", "ChangeVersion", "DocumentId"],
            ),
            ("ReferentialIdentity", "IX_ReferentialIdentity_DocumentId", &["DocumentId"]),
        ];

        for (table, name, columns) in indexes {
            let table = DbTableName::new(self.dms(), table)?;
            writer.append_line(&self.dialect.create_index_if_not_exists(
                &table,
                name,
                &cols(columns),
                false,
            )?);
            writer.new_line();
        }
        Ok(())
    }

    // =========================================================================
    // Phase 6: Triggers
    // =========================================================================

    fn emit_triggers(&self, writer: &mut SqlWriter<'_>) {
        write_phase_header(writer, "Phase 6: Triggers");

        if let Some(extension) = self.dialect.create_extension_if_not_exists("pgcrypto") {
            writer.append_line(&extension);
            writer.new_line();
        }

        // CREATE FUNCTION must open its own T-SQL batch.
        if self.dialect.kind() == SqlDialectKind::Mssql {
            writer.append_line("GO");
        }
        writer.append_line(&self.dialect.create_uuidv5_function(&self.dms()));
        writer.new_line();

        match self.dialect.kind() {
            SqlDialectKind::Pgsql => self.emit_pgsql_journal_trigger(writer),
            SqlDialectKind::Mssql => self.emit_mssql_journal_trigger(writer),
        }
    }

    fn emit_pgsql_journal_trigger(&self, writer: &mut SqlWriter<'_>) {
        let d = &self.dialect;
        let q = |id: &str| d.quote_identifier(id);
        let document = dms_table("Document");
        let change_table = d.qualify_table(&dms_table("DocumentChangeEvent"));
        let function = d.qualify_name(&self.dms(), JOURNAL_FUNCTION);

        writer.append_line(&format!("CREATE OR REPLACE FUNCTION {}()", function));
        writer.append_line("RETURNS TRIGGER AS $$");
        writer.append_line("BEGIN");
        {
            let mut body = writer.indent();
            body.append_line(&format!(
                "INSERT INTO {} ({}, {}, {}, {})",
                change_table,
                q("ChangeVersion"),
                q("DocumentId"),
                q("ResourceKeyId"),
                q("CreatedAt")
            ));
            body.append_line(&format!(
                "SELECT d.{}, d.{}, d.{}, now()",
                q("ContentVersion"),
                q("DocumentId"),
                q("ResourceKeyId")
            ));
            body.append_line("FROM (");
            {
                let mut inner = body.indent();
                inner.append_line(&format!(
                    "SELECT DISTINCT ON ({}) {}, {}, {}",
                    q("DocumentId"),
                    q("ContentVersion"),
                    q("DocumentId"),
                    q("ResourceKeyId")
                ));
                inner.append_line("FROM new_table");
            }
            body.append_line(") d;");
            body.append_line("RETURN NULL;");
        }
        writer.append_line("END;");
        writer.append_line("$$ LANGUAGE plpgsql;");
        writer.new_line();

        writer.append_line(&d.drop_trigger_if_exists(&document, JOURNAL_TRIGGER));
        writer.append_line(&format!("CREATE TRIGGER {}", q(JOURNAL_TRIGGER)));
        {
            let mut clauses = writer.indent();
            clauses.append_line(&format!(
                "AFTER INSERT OR UPDATE OF {} ON {}",
                q("ContentVersion"),
                d.qualify_table(&document)
            ));
            clauses.append_line("REFERENCING NEW TABLE AS new_table");
            clauses.append_line("FOR EACH STATEMENT");
            clauses.append_line(&format!("EXECUTE FUNCTION {}();", function));
        }
        writer.new_line();
    }

    fn emit_mssql_journal_trigger(&self, writer: &mut SqlWriter<'_>) {
        let d = &self.dialect;
        let q = |id: &str| d.quote_identifier(id);
        let change_table = d.qualify_table(&dms_table("DocumentChangeEvent"));

        // CREATE OR ALTER TRIGGER must open its own T-SQL batch.
        writer.append_line("GO");
        writer.append_line(&format!(
            "CREATE OR ALTER TRIGGER {}",
            d.qualify_name(&self.dms(), JOURNAL_TRIGGER)
        ));
        writer.append_line(&format!("ON {}", d.qualify_table(&dms_table("Document"))));
        writer.append_line("AFTER INSERT, UPDATE");
        writer.append_line("AS");
        writer.append_line("BEGIN");
        {
            let mut body = writer.indent();
            body.append_line("SET NOCOUNT ON;");
            body.append_line(&format!(
                "IF UPDATE({}) OR NOT EXISTS (SELECT 1 FROM deleted)",
                q("ContentVersion")
            ));
            body.append_line("BEGIN");
            {
                let mut inner = body.indent();
                inner.append_line(&format!(
                    "INSERT INTO {} ({}, {}, {}, {})",
                    change_table,
                    q("ChangeVersion"),
                    q("DocumentId"),
                    q("ResourceKeyId"),
                    q("CreatedAt")
                ));
                inner.append_line(&format!(
                    "SELECT i.{}, i.{}, i.{}, sysutcdatetime()",
                    q("ContentVersion"),
                    q("DocumentId"),
                    q("ResourceKeyId")
                ));
                inner.append_line("FROM inserted i;");
            }
            body.append_line("END");
        }
        writer.append_line("END;");
        writer.new_line();
    }
}
