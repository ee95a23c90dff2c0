//! Relational DDL for a derived resource mapping.
//!
//! Output order:
//! 1. Project schemas
//! 2. Concrete resource tables (PK/UNIQUE/CHECK inline, no foreign keys)
//! 3. Abstract identity tables
//! 4. Foreign keys, as guarded `ALTER TABLE` statements
//! 5. Abstract union views
//! 6. Indexes
//! 7. Triggers

use super::{dms_table, write_table, CHANGE_VERSION_SEQUENCE, DMS_SCHEMA};
use crate::dialect::{Dialect, DdlPattern, ForeignKeyDef, SqlDialect, SqlDialectKind};
use crate::error::{DdlError, Result};
use crate::identity::REFERENTIAL_ID_NAMESPACE_STR;
use crate::model::{
    AbstractUnionViewInfo, ColumnKind, DbColumnModel, DbColumnName, DbIndexInfo, DbSchemaName,
    DbTableModel, DbTriggerInfo, DerivedRelationalModelSet, IdentityElementMapping,
    ProjectionExpression, PropagationReferrerTarget, TableConstraint, TriggerColumnMapping,
    TriggerKind,
};
use crate::writer::SqlWriter;
use tracing::{debug, info};

/// Dollar-quote tag for trigger function bodies. Referential id names embed
/// `$$` (a `$` prefix on a `$.path`), so `$$` cannot delimit the body.
const PGSQL_BODY_TAG: &str = "$trigger$";

/// Emits DDL for a [`DerivedRelationalModelSet`].
#[derive(Debug, Clone, Copy)]
pub struct RelationalModelDdlEmitter {
    dialect: Dialect,
}

impl RelationalModelDdlEmitter {
    pub fn new(dialect: impl Into<Dialect>) -> Self {
        Self {
            dialect: dialect.into(),
        }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Render the relational DDL for a model set.
    ///
    /// Fails when the set was derived for another dialect or is malformed.
    pub fn emit(&self, model_set: &DerivedRelationalModelSet) -> Result<String> {
        if model_set.dialect != self.dialect.kind() {
            return Err(DdlError::DialectMismatch {
                model: model_set.dialect,
                emitter: self.dialect.kind(),
            });
        }
        model_set.validate()?;

        let mut writer = SqlWriter::new(&self.dialect);

        debug!(
            schemas = model_set.project_schemas_in_endpoint_order.len(),
            "Emitting project schemas"
        );
        for schema in &model_set.project_schemas_in_endpoint_order {
            writer.append_line(&self.dialect.create_schema_if_not_exists(&schema.physical_schema));
        }
        if !model_set.project_schemas_in_endpoint_order.is_empty() {
            writer.new_line();
        }

        debug!(
            resources = model_set.concrete_resources_in_name_order.len(),
            "Emitting resource tables"
        );
        for table in model_set.resource_tables() {
            self.emit_create_table(&mut writer, table)?;
        }

        for identity_table in &model_set.abstract_identity_tables_in_name_order {
            self.emit_create_table(&mut writer, &identity_table.table_model)?;
        }

        for table in model_set.all_tables() {
            self.emit_foreign_keys(&mut writer, table)?;
        }

        debug!(
            views = model_set.abstract_union_views_in_name_order.len(),
            indexes = model_set.indexes_in_create_order.len(),
            "Emitting views and indexes"
        );
        for view in &model_set.abstract_union_views_in_name_order {
            self.emit_union_view(&mut writer, view)?;
        }
        // The last view's batch must close before the index DDL.
        if self.dialect.kind() == SqlDialectKind::Mssql
            && !model_set.abstract_union_views_in_name_order.is_empty()
            && !model_set.indexes_in_create_order.is_empty()
        {
            writer.append_line("GO");
            writer.new_line();
        }

        for index in &model_set.indexes_in_create_order {
            self.emit_index(&mut writer, index)?;
        }

        debug!(
            triggers = model_set.triggers_in_create_order.len(),
            "Emitting triggers"
        );
        for trigger in &model_set.triggers_in_create_order {
            match self.dialect.kind() {
                SqlDialectKind::Pgsql => self.emit_pgsql_trigger(&mut writer, trigger)?,
                SqlDialectKind::Mssql => self.emit_mssql_trigger(&mut writer, trigger)?,
            }
        }

        let sql = writer.into_sql();
        info!(
            dialect = %self.dialect.kind(),
            tables = model_set.all_tables().count(),
            bytes = sql.len(),
            "Relational DDL emitted"
        );
        Ok(sql)
    }

    fn q(&self, identifier: &str) -> String {
        self.dialect.quote_identifier(identifier)
    }

    fn qc(&self, column: &DbColumnName) -> String {
        self.dialect.quote_identifier(column.as_str())
    }

    // =========================================================================
    // Tables
    // =========================================================================

    fn emit_create_table(&self, writer: &mut SqlWriter<'_>, table: &DbTableModel) -> Result<()> {
        let mut definitions = Vec::with_capacity(table.columns.len() + table.constraints.len() + 1);

        for column in &table.columns {
            let sql_type = self.resolve_column_type(column)?;
            let definition = match &column.computed {
                Some(alias) => self.dialect.render_computed_column_definition(
                    &column.column_name,
                    &sql_type,
                    &alias.canonical_column,
                    alias.presence_column.as_ref(),
                ),
                None => self.dialect.render_column_definition(
                    &column.column_name,
                    &sql_type,
                    column.is_nullable,
                    None,
                ),
            };
            definitions.push(definition);
        }

        if !table.key.columns.is_empty() {
            let key_columns: Vec<DbColumnName> =
                table.key.columns.iter().map(|k| k.column_name.clone()).collect();
            definitions.push(format!(
                "CONSTRAINT {} {}",
                self.q(&self.primary_key_name(table)),
                self.dialect.render_primary_key_clause(&key_columns)?
            ));
        }

        definitions.extend(
            table
                .constraints
                .iter()
                .filter_map(|constraint| self.format_inline_constraint(constraint)),
        );

        write_table(writer, &table.table, &definitions);
        Ok(())
    }

    /// Explicit name when set, otherwise `PK_{schema}_{table}` fitted to the dialect.
    fn primary_key_name(&self, table: &DbTableModel) -> String {
        match table.key.constraint_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => self.dialect.rules().shorten_identifier(&format!(
                "PK_{}_{}",
                table.table.schema(),
                table.table.name()
            )),
        }
    }

    fn resolve_column_type(&self, column: &DbColumnModel) -> Result<String> {
        if let Some(scalar_type) = &column.scalar_type {
            return Ok(self.dialect.render_column_type(scalar_type));
        }
        let defaults = self.dialect.rules().scalar_type_defaults();
        match column.kind {
            ColumnKind::Ordinal => Ok(defaults.int32_type.to_string()),
            ColumnKind::DocumentFk | ColumnKind::DescriptorFk | ColumnKind::ParentKeyPart => {
                Ok(defaults.int64_type.to_string())
            }
            ColumnKind::Scalar => Err(DdlError::invalid_model(format!(
                "Column '{}' of kind {:?} has no scalar type",
                column.column_name, column.kind
            ))),
        }
    }

    /// Inline table constraint text; foreign keys are emitted after all tables.
    fn format_inline_constraint(&self, constraint: &TableConstraint) -> Option<String> {
        match constraint {
            TableConstraint::ForeignKey { .. } => None,
            TableConstraint::Unique { name, columns } => Some(format!(
                "CONSTRAINT {} UNIQUE ({})",
                self.q(name),
                self.dialect.column_list(columns)
            )),
            TableConstraint::Check { name, expression } => {
                Some(format!("CONSTRAINT {} CHECK ({})", self.q(name), expression))
            }
            TableConstraint::AllOrNoneNullability {
                name,
                fk_column,
                dependent_columns,
            } => {
                let dependents = dependent_columns
                    .iter()
                    .map(|c| format!("{} IS NOT NULL", self.qc(c)))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                Some(format!(
                    "CONSTRAINT {} CHECK (({} IS NULL) OR ({}))",
                    self.q(name),
                    self.qc(fk_column),
                    dependents
                ))
            }
        }
    }

    fn emit_foreign_keys(&self, writer: &mut SqlWriter<'_>, table: &DbTableModel) -> Result<()> {
        for constraint in table.foreign_keys() {
            if let TableConstraint::ForeignKey {
                name,
                columns,
                target_table,
                target_columns,
                on_delete,
                on_update,
            } = constraint
            {
                writer.append_line(&self.dialect.add_foreign_key_constraint(&ForeignKeyDef {
                    table: &table.table,
                    name,
                    columns,
                    target_table,
                    target_columns,
                    on_delete: *on_delete,
                    on_update: *on_update,
                })?);
                writer.new_line();
            }
        }
        Ok(())
    }

    fn emit_index(&self, writer: &mut SqlWriter<'_>, index: &DbIndexInfo) -> Result<()> {
        writer.append_line(&self.dialect.create_index_if_not_exists(
            &index.table,
            index.name.as_str(),
            &index.key_columns,
            index.is_unique,
        )?);
        writer.new_line();
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    fn emit_union_view(&self, writer: &mut SqlWriter<'_>, view: &AbstractUnionViewInfo) -> Result<()> {
        if view.union_arms_in_order.is_empty() {
            return Err(DdlError::invalid_model(format!(
                "Abstract union view '{}' has no union arms",
                view.view_name
            )));
        }

        // CREATE OR ALTER VIEW must open its own T-SQL batch.
        if self.dialect.kind() == SqlDialectKind::Mssql {
            writer.append_line("GO");
        }
        writer.append_line(&format!(
            "{} {} AS",
            create_clause(self.dialect.view_creation_pattern(), "VIEW"),
            self.dialect.qualify_table(&view.view_name)
        ));

        for (i, arm) in view.union_arms_in_order.iter().enumerate() {
            if arm.projection_expressions.len() != view.output_columns.len() {
                return Err(DdlError::invalid_model(format!(
                    "Union arm from table '{}' has {} projection expressions but view '{}' expects {} output columns",
                    arm.from_table,
                    arm.projection_expressions.len(),
                    view.view_name,
                    view.output_columns.len()
                )));
            }
            if i > 0 {
                writer.append_line("UNION ALL");
            }

            let projections = arm
                .projection_expressions
                .iter()
                .zip(&view.output_columns)
                .map(|(expression, output)| {
                    let source = match expression {
                        ProjectionExpression::SourceColumn(column) => self.qc(column),
                        ProjectionExpression::StringLiteral(value) => {
                            self.dialect.render_string_literal(value)
                        }
                    };
                    format!(
                        "CAST({} AS {}) AS {}",
                        source,
                        self.dialect.render_column_type(&output.scalar_type),
                        self.qc(&output.column_name)
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");

            writer.append_line(&format!("SELECT {}", projections));
            writer.append_line(&format!("FROM {}", self.dialect.qualify_table(&arm.from_table)));
        }

        writer.append_line(";");
        writer.new_line();
        Ok(())
    }

    // =========================================================================
    // Triggers
    // =========================================================================

    fn emit_pgsql_trigger(&self, writer: &mut SqlWriter<'_>, trigger: &DbTriggerInfo) -> Result<()> {
        let schema = trigger.table.schema();
        let function = self.dialect.qualify_name(
            schema,
            &self
                .dialect
                .rules()
                .shorten_identifier(&format!("TF_{}", trigger.name)),
        );

        writer.append_line(&format!(
            "{} {}()",
            create_clause(self.dialect.function_creation_pattern(), "FUNCTION"),
            function
        ));
        writer.append_line(&format!("RETURNS TRIGGER AS {}", PGSQL_BODY_TAG));
        writer.append_line("BEGIN");
        {
            let mut body = writer.indent();
            self.emit_trigger_body(&mut body, trigger)?;
            body.append_line("RETURN NEW;");
        }
        writer.append_line("END;");
        writer.append_line(&format!("{} LANGUAGE plpgsql;", PGSQL_BODY_TAG));
        writer.new_line();

        let pattern = self.dialect.trigger_creation_pattern();
        if pattern == DdlPattern::DropThenCreate {
            writer.append_line(
                &self
                    .dialect
                    .drop_trigger_if_exists(&trigger.table, trigger.name.as_str()),
            );
        }
        writer.append_line(&format!(
            "{} {}",
            create_clause(pattern, "TRIGGER"),
            self.q(trigger.name.as_str())
        ));
        writer.append_line(&format!(
            "BEFORE INSERT OR UPDATE ON {}",
            self.dialect.qualify_table(&trigger.table)
        ));
        writer.append_line("FOR EACH ROW");
        writer.append_line(&format!("EXECUTE FUNCTION {}();", function));
        writer.new_line();
        Ok(())
    }

    fn emit_mssql_trigger(&self, writer: &mut SqlWriter<'_>, trigger: &DbTriggerInfo) -> Result<()> {
        // CREATE OR ALTER TRIGGER must open its own T-SQL batch.
        writer.append_line("GO");
        writer.append_line(&format!(
            "{} {}",
            create_clause(self.dialect.trigger_creation_pattern(), "TRIGGER"),
            self.dialect
                .qualify_name(trigger.table.schema(), trigger.name.as_str())
        ));
        writer.append_line(&format!("ON {}", self.dialect.qualify_table(&trigger.table)));
        writer.append_line(match trigger.kind {
            TriggerKind::IdentityPropagationFallback { .. } => "AFTER UPDATE",
            _ => "AFTER INSERT, UPDATE",
        });
        writer.append_line("AS");
        writer.append_line("BEGIN");
        {
            let mut body = writer.indent();
            body.append_line("SET NOCOUNT ON;");
            self.emit_trigger_body(&mut body, trigger)?;
        }
        writer.append_line("END;");
        writer.new_line();
        Ok(())
    }

    fn emit_trigger_body(&self, writer: &mut SqlWriter<'_>, trigger: &DbTriggerInfo) -> Result<()> {
        match &trigger.kind {
            TriggerKind::DocumentStamping => self.emit_document_stamping(writer, trigger),
            TriggerKind::ReferentialIdentityMaintenance {
                resource_key_id,
                project_name,
                resource_name,
                identity_elements,
                superclass_alias,
            } => {
                self.emit_referential_identity(
                    writer,
                    trigger,
                    *resource_key_id,
                    project_name,
                    resource_name,
                    identity_elements,
                )?;
                if let Some(alias) = superclass_alias {
                    self.emit_referential_identity(
                        writer,
                        trigger,
                        alias.resource_key_id,
                        &alias.project_name,
                        &alias.resource_name,
                        &alias.identity_elements,
                    )?;
                }
                Ok(())
            }
            TriggerKind::AbstractIdentityMaintenance {
                target_table,
                target_column_mappings,
                discriminator_value,
            } => {
                let target = self.dialect.qualify_table(target_table);
                match self.dialect.kind() {
                    SqlDialectKind::Pgsql => self.emit_pgsql_abstract_identity(
                        writer,
                        &target,
                        target_column_mappings,
                        discriminator_value,
                    ),
                    SqlDialectKind::Mssql => self.emit_mssql_abstract_identity(
                        writer,
                        &target,
                        target_column_mappings,
                        discriminator_value,
                    ),
                }
                Ok(())
            }
            TriggerKind::IdentityPropagationFallback { referrer_updates } => {
                if self.dialect.kind() != SqlDialectKind::Mssql {
                    return Err(DdlError::invalid_model(format!(
                        "IdentityPropagationFallback trigger '{}' is only supported for mssql, but dialect is {}",
                        trigger.name,
                        self.dialect.kind()
                    )));
                }
                let key_column = single_key_column(trigger)?;
                for (i, target) in referrer_updates.iter().enumerate() {
                    if i > 0 {
                        writer.new_line();
                    }
                    self.emit_identity_propagation(writer, key_column, target);
                }
                Ok(())
            }
        }
    }

    fn emit_document_stamping(&self, writer: &mut SqlWriter<'_>, trigger: &DbTriggerInfo) -> Result<()> {
        let key = self.qc(single_key_column(trigger)?);
        let document = self.dialect.qualify_table(&dms_table("Document"));
        let sequence = self
            .dialect
            .qualify_name(&DbSchemaName::from_static(DMS_SCHEMA), CHANGE_VERSION_SEQUENCE);
        let projection = &trigger.identity_projection_columns;

        match self.dialect.kind() {
            SqlDialectKind::Pgsql => {
                let stamp = |w: &mut SqlWriter<'_>, version: &str, modified_at: &str| {
                    w.append_line(&format!("UPDATE {}", document));
                    w.append_line(&format!(
                        "SET {} = nextval('{}'), {} = now()",
                        self.q(version),
                        sequence,
                        self.q(modified_at)
                    ));
                    w.append_line(&format!("WHERE {} = NEW.{};", self.q("DocumentId"), key));
                };

                stamp(writer, "ContentVersion", "ContentLastModifiedAt");
                if !projection.is_empty() {
                    let changed = projection
                        .iter()
                        .map(|c| format!("OLD.{0} IS DISTINCT FROM NEW.{0}", self.qc(c)))
                        .collect::<Vec<_>>()
                        .join(" OR ");
                    writer.append_line(&format!("IF TG_OP = 'UPDATE' AND ({}) THEN", changed));
                    {
                        let mut inner = writer.indent();
                        stamp(&mut *inner, "IdentityVersion", "IdentityLastModifiedAt");
                    }
                    writer.append_line("END IF;");
                }
            }
            SqlDialectKind::Mssql => {
                let stamp = |w: &mut SqlWriter<'_>, version: &str, modified_at: &str| {
                    w.append_line("UPDATE d");
                    w.append_line(&format!(
                        "SET d.{} = NEXT VALUE FOR {}, d.{} = sysutcdatetime()",
                        self.q(version),
                        sequence,
                        self.q(modified_at)
                    ));
                    w.append_line(&format!("FROM {} d", document));
                    w.append(&format!(
                        "INNER JOIN inserted i ON d.{} = i.{}",
                        self.q("DocumentId"),
                        key
                    ));
                };

                stamp(writer, "ContentVersion", "ContentLastModifiedAt");
                writer.append_line(";");
                if !projection.is_empty() {
                    let updated = projection
                        .iter()
                        .map(|c| format!("UPDATE({})", self.qc(c)))
                        .collect::<Vec<_>>()
                        .join(" OR ");
                    writer.append_line(&format!(
                        "IF EXISTS (SELECT 1 FROM deleted) AND ({})",
                        updated
                    ));
                    writer.append_line("BEGIN");
                    {
                        let mut inner = writer.indent();
                        stamp(&mut *inner, "IdentityVersion", "IdentityLastModifiedAt");
                        inner.new_line();
                        inner.append_line(&format!(
                            "INNER JOIN deleted del ON del.{0} = i.{0}",
                            key
                        ));
                        let changed = projection
                            .iter()
                            .map(|c| mssql_null_safe_not_equal("i", &self.qc(c), "del"))
                            .collect::<Vec<_>>()
                            .join(" OR ");
                        inner.append_line(&format!("WHERE {};", changed));
                    }
                    writer.append_line("END");
                }
            }
        }
        Ok(())
    }

    fn emit_referential_identity(
        &self,
        writer: &mut SqlWriter<'_>,
        trigger: &DbTriggerInfo,
        resource_key_id: i16,
        project_name: &str,
        resource_name: &str,
        elements: &[IdentityElementMapping],
    ) -> Result<()> {
        if elements.is_empty() {
            return Err(DdlError::invalid_model(format!(
                "ReferentialIdentityMaintenance trigger '{}' requires at least one identity element for resource '{}'",
                trigger.name, resource_name
            )));
        }

        let d = &self.dialect;
        let table = d.qualify_table(&dms_table("ReferentialIdentity"));
        let document_id = self.q("DocumentId");
        let resource_key = self.q("ResourceKeyId");
        let uuidv5 = d.qualify_name(&DbSchemaName::from_static(DMS_SCHEMA), "uuidv5");
        let resource_prefix = d.render_string_literal(&format!("{}{}", project_name, resource_name));
        let rk = d.render_smallint_literal(resource_key_id);

        let element_term = |element: &IdentityElementMapping, value: String| {
            format!(
                "{} {} {}",
                d.render_string_literal(&format!("${}=", element.identity_json_path)),
                concat_operator(d),
                value
            )
        };

        match d.kind() {
            SqlDialectKind::Pgsql => {
                let name = elements
                    .iter()
                    .map(|e| element_term(e, format!("NEW.{}::text", self.qc(&e.column))))
                    .collect::<Vec<_>>()
                    .join(" || '#' || ");

                writer.append_line(&format!("DELETE FROM {}", table));
                writer.append_line(&format!(
                    "WHERE {} = NEW.{} AND {} = {};",
                    document_id, document_id, resource_key, rk
                ));
                writer.append_line(&format!(
                    "INSERT INTO {} ({}, {}, {})",
                    table,
                    self.q("ReferentialId"),
                    document_id,
                    resource_key
                ));
                writer.append_line(&format!(
                    "VALUES ({}('{}'::uuid, {} || {}), NEW.{}, {});",
                    uuidv5, REFERENTIAL_ID_NAMESPACE_STR, resource_prefix, name, document_id, rk
                ));
            }
            SqlDialectKind::Mssql => {
                let name = elements
                    .iter()
                    .map(|e| {
                        element_term(e, format!("CAST(i.{} AS nvarchar(max))", self.qc(&e.column)))
                    })
                    .collect::<Vec<_>>()
                    .join(" + N'#' + ");

                writer.append_line(&format!("DELETE FROM {}", table));
                writer.append_line(&format!(
                    "WHERE {} IN (SELECT {} FROM inserted) AND {} = {};",
                    document_id, document_id, resource_key, rk
                ));
                writer.append_line(&format!(
                    "INSERT INTO {} ({}, {}, {})",
                    table,
                    self.q("ReferentialId"),
                    document_id,
                    resource_key
                ));
                writer.append_line(&format!(
                    "SELECT {}('{}', {} + {}), i.{}, {}",
                    uuidv5, REFERENTIAL_ID_NAMESPACE_STR, resource_prefix, name, document_id, rk
                ));
                writer.append_line("FROM inserted i;");
            }
        }
        Ok(())
    }

    fn emit_pgsql_abstract_identity(
        &self,
        writer: &mut SqlWriter<'_>,
        target: &str,
        mappings: &[TriggerColumnMapping],
        discriminator: &str,
    ) {
        let document_id = self.q("DocumentId");
        let targets: Vec<String> = mappings.iter().map(|m| self.qc(&m.target_column)).collect();
        let sources: Vec<String> = mappings
            .iter()
            .map(|m| format!("NEW.{}", self.qc(&m.source_column)))
            .collect();
        let updates: Vec<String> = targets
            .iter()
            .map(|t| format!("{0} = EXCLUDED.{0}", t))
            .collect();

        writer.append_line(&format!(
            "INSERT INTO {} ({}, {}, {})",
            target,
            document_id,
            targets.join(", "),
            self.q("Discriminator")
        ));
        writer.append_line(&format!(
            "VALUES (NEW.{}, {}, {})",
            document_id,
            sources.join(", "),
            self.dialect.render_string_literal(discriminator)
        ));
        writer.append_line(&format!("ON CONFLICT ({})", document_id));
        writer.append_line(&format!("DO UPDATE SET {};", updates.join(", ")));
    }

    fn emit_mssql_abstract_identity(
        &self,
        writer: &mut SqlWriter<'_>,
        target: &str,
        mappings: &[TriggerColumnMapping],
        discriminator: &str,
    ) {
        let document_id = self.q("DocumentId");
        let updates: Vec<String> = mappings
            .iter()
            .map(|m| format!("t.{} = s.{}", self.qc(&m.target_column), self.qc(&m.source_column)))
            .collect();
        let targets: Vec<String> = mappings.iter().map(|m| self.qc(&m.target_column)).collect();
        let sources: Vec<String> = mappings
            .iter()
            .map(|m| format!("s.{}", self.qc(&m.source_column)))
            .collect();

        writer.append_line(&format!("MERGE {} AS t", target));
        writer.append_line(&format!(
            "USING inserted AS s ON t.{0} = s.{0}",
            document_id
        ));
        writer.append_line(&format!("WHEN MATCHED THEN UPDATE SET {}", updates.join(", ")));
        writer.append_line(&format!(
            "WHEN NOT MATCHED THEN INSERT ({}, {}, {})",
            document_id,
            targets.join(", "),
            self.q("Discriminator")
        ));
        writer.append_line(&format!(
            "VALUES (s.{}, {}, {});",
            document_id,
            sources.join(", "),
            self.dialect.render_string_literal(discriminator)
        ));
    }

    /// Copies changed identity values onto rows whose `fk_column` references
    /// the updated document.
    fn emit_identity_propagation(
        &self,
        writer: &mut SqlWriter<'_>,
        key_column: &DbColumnName,
        target: &PropagationReferrerTarget,
    ) {
        let key = self.qc(key_column);
        let assignments = target
            .column_mappings
            .iter()
            .map(|m| format!("t.{} = i.{}", self.qc(&m.target_column), self.qc(&m.source_column)))
            .collect::<Vec<_>>()
            .join(", ");
        let changed = target
            .column_mappings
            .iter()
            .map(|m| mssql_null_safe_not_equal("i", &self.qc(&m.source_column), "d"))
            .collect::<Vec<_>>()
            .join(" OR ");

        writer.append_line("UPDATE t");
        writer.append_line(&format!("SET {}", assignments));
        writer.append_line(&format!(
            "FROM {} t",
            self.dialect.qualify_table(&target.referrer_table)
        ));
        writer.append_line(&format!(
            "INNER JOIN deleted d ON t.{} = d.{}",
            self.qc(&target.referrer_document_id_column),
            key
        ));
        writer.append_line(&format!("INNER JOIN inserted i ON i.{0} = d.{0}", key));
        writer.append_line(&format!("WHERE {};", changed));
    }
}

fn create_clause(pattern: DdlPattern, object: &str) -> String {
    match pattern {
        DdlPattern::CreateOrReplace => format!("CREATE OR REPLACE {}", object),
        DdlPattern::CreateOrAlter => format!("CREATE OR ALTER {}", object),
        DdlPattern::CreateIfNotExists | DdlPattern::DropThenCreate => format!("CREATE {}", object),
    }
}

fn concat_operator(dialect: &Dialect) -> &'static str {
    match dialect.kind() {
        SqlDialectKind::Pgsql => "||",
        SqlDialectKind::Mssql => "+",
    }
}

fn single_key_column(trigger: &DbTriggerInfo) -> Result<&DbColumnName> {
    match trigger.key_columns.as_slice() {
        [key] => Ok(key),
        keys => Err(DdlError::invalid_model(format!(
            "{} trigger '{}' requires exactly one key column, but has {}",
            trigger.kind.label(),
            trigger.name,
            keys.len()
        ))),
    }
}

/// SQL Server spelling of `l.c IS DISTINCT FROM r.c`.
fn mssql_null_safe_not_equal(left: &str, column: &str, right: &str) -> String {
    format!(
        "({l}.{c} <> {r}.{c} OR ({l}.{c} IS NULL AND {r}.{c} IS NOT NULL) OR ({l}.{c} IS NOT NULL AND {r}.{c} IS NULL))",
        l = left,
        c = column,
        r = right
    )
}
