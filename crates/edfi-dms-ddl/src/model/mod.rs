//! Immutable input model consumed by the emitters.
//!
//! Every value here is produced upstream by the schema-derivation step and
//! handed to an emitter read-only. All collections are ordered `Vec`s so
//! that iteration order, and therefore output, is stable.

mod effective_schema;
mod names;
mod resource;
mod table;
pub mod validation;

pub use effective_schema::{
    EffectiveSchemaInfo, ResourceKeyEntry, SchemaComponentInfo, SEED_HASH_LENGTH,
};
pub use names::{
    DbColumnName, DbIndexName, DbSchemaName, DbTableName, DbTriggerName, QualifiedResourceName,
};
pub use resource::{
    AbstractIdentityTableInfo, AbstractUnionViewArm, AbstractUnionViewInfo,
    AbstractUnionViewOutputColumn, ConcreteResourceModel, DbIndexInfo, DbIndexKind,
    DbTriggerInfo, DescriptorEdgeSource, DocumentReferenceBinding, IdentityElementMapping,
    ProjectSchemaInfo, ProjectionExpression, PropagationReferrerTarget, RelationalResourceModel,
    ResourceStorageKind, SuperclassAlias, TriggerColumnMapping, TriggerKind,
};
pub use table::{
    ColumnKind, DbColumnModel, DbKeyColumn, DbTableModel, ReferentialAction,
    RelationalScalarType, ScalarKind, TableConstraint, TableKey, UnifiedAlias,
};

use crate::dialect::SqlDialectKind;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// The complete derived relational model for one dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRelationalModelSet {
    pub effective_schema: EffectiveSchemaInfo,
    pub dialect: SqlDialectKind,
    pub project_schemas_in_endpoint_order: Vec<ProjectSchemaInfo>,
    pub concrete_resources_in_name_order: Vec<ConcreteResourceModel>,
    #[serde(default)]
    pub abstract_identity_tables_in_name_order: Vec<AbstractIdentityTableInfo>,
    #[serde(default)]
    pub abstract_union_views_in_name_order: Vec<AbstractUnionViewInfo>,
    #[serde(default)]
    pub indexes_in_create_order: Vec<DbIndexInfo>,
    #[serde(default)]
    pub triggers_in_create_order: Vec<DbTriggerInfo>,
}

impl DerivedRelationalModelSet {
    /// Load from a JSON or YAML file, chosen by extension, and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let set: Self = load_document(path.as_ref())?;
        set.validate()?;
        Ok(set)
    }

    /// Run every well-formedness check.
    pub fn validate(&self) -> Result<()> {
        validation::validate_model_set(self)
    }

    /// Every table of every concrete resource, in declared order.
    pub fn resource_tables(&self) -> impl Iterator<Item = &DbTableModel> {
        self.concrete_resources_in_name_order
            .iter()
            .flat_map(|r| r.relational_model.tables_in_dependency_order.iter())
    }

    /// Resource tables plus abstract identity tables.
    pub fn all_tables(&self) -> impl Iterator<Item = &DbTableModel> {
        self.resource_tables().chain(
            self.abstract_identity_tables_in_name_order
                .iter()
                .map(|t| &t.table_model),
        )
    }

    /// Look up a table by name.
    pub fn find_table(&self, name: &DbTableName) -> Option<&DbTableModel> {
        self.all_tables().find(|t| &t.table == name)
    }
}

/// Deserialize a document as YAML (`.yaml`/`.yml`) or JSON (anything else).
pub(crate) fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    debug!(path = %path.display(), yaml = is_yaml, "Loading model document");

    if is_yaml {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}
