//! Resource-level model: concrete resources, abstract identity tables,
//! union views, indexes and triggers.

use super::names::{
    DbColumnName, DbIndexName, DbSchemaName, DbTableName, DbTriggerName, QualifiedResourceName,
};
use super::table::{DbTableModel, RelationalScalarType};
use serde::{Deserialize, Serialize};

/// A project's physical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSchemaInfo {
    pub project_endpoint_name: String,
    pub project_name: String,
    pub project_version: String,
    #[serde(default)]
    pub is_extension_project: bool,
    pub physical_schema: DbSchemaName,
}

/// How a resource's documents are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStorageKind {
    /// Decomposed into relational tables.
    #[default]
    RelationalTables,
    /// Stored in the shared `dms.Descriptor` table.
    SharedDescriptorTable,
}

/// Where a document reference lands in the relational tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReferenceBinding {
    pub reference_object_path: String,
    pub table: DbTableName,
    pub fk_column: DbColumnName,
    pub target_resource: QualifiedResourceName,
}

/// Where a descriptor value lands in the relational tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorEdgeSource {
    pub descriptor_value_path: String,
    pub table: DbTableName,
    pub fk_column: DbColumnName,
    pub descriptor_resource: QualifiedResourceName,
}

/// Relational mapping of one concrete resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationalResourceModel {
    pub resource: QualifiedResourceName,
    pub physical_schema: DbSchemaName,
    #[serde(default)]
    pub storage_kind: ResourceStorageKind,
    pub root_table: DbTableName,
    /// Root first, then each child after its parent.
    pub tables_in_dependency_order: Vec<DbTableModel>,
    #[serde(default)]
    pub document_reference_bindings: Vec<DocumentReferenceBinding>,
    #[serde(default)]
    pub descriptor_edge_sources: Vec<DescriptorEdgeSource>,
}

/// A concrete resource paired with its resource key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteResourceModel {
    pub resource_key_id: i16,
    #[serde(default)]
    pub storage_kind: ResourceStorageKind,
    pub relational_model: RelationalResourceModel,
}

/// Shared identity table of a polymorphic superclass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractIdentityTableInfo {
    pub abstract_resource_key_id: i16,
    pub resource: QualifiedResourceName,
    pub table_model: DbTableModel,
}

/// Output column of an abstract union view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractUnionViewOutputColumn {
    pub column_name: DbColumnName,
    pub scalar_type: RelationalScalarType,
}

/// An expression projected by one union arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionExpression {
    SourceColumn(DbColumnName),
    StringLiteral(String),
}

/// One `SELECT` arm of an abstract union view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractUnionViewArm {
    pub concrete_member_resource_key_id: i16,
    pub from_table: DbTableName,
    /// Aligned with the view's output columns.
    pub projection_expressions: Vec<ProjectionExpression>,
}

/// A view unioning every concrete subtype of an abstract resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractUnionViewInfo {
    pub abstract_resource_key_id: i16,
    pub view_name: DbTableName,
    pub output_columns: Vec<AbstractUnionViewOutputColumn>,
    pub union_arms_in_order: Vec<AbstractUnionViewArm>,
}

/// Why an index exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbIndexKind {
    PrimaryKey,
    UniqueConstraint,
    #[default]
    ForeignKeySupport,
    Explicit,
}

/// A secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbIndexInfo {
    pub name: DbIndexName,
    pub table: DbTableName,
    pub key_columns: Vec<DbColumnName>,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub kind: DbIndexKind,
}

/// One identity element of a referential-identity trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityElementMapping {
    pub column: DbColumnName,
    /// JSON path written into the UUIDv5 name (`$.schoolId`).
    pub identity_json_path: String,
}

/// Superclass registration for a subtype's referential identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperclassAlias {
    pub resource_key_id: i16,
    pub project_name: String,
    pub resource_name: String,
    pub identity_elements: Vec<IdentityElementMapping>,
}

/// Source to target column copy used by identity maintenance triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerColumnMapping {
    pub source_column: DbColumnName,
    pub target_column: DbColumnName,
}

/// A referencing table whose stored identity copy follows the referenced row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationReferrerTarget {
    pub referrer_table: DbTableName,
    /// FK column on the referrer holding the referenced `DocumentId`.
    pub referrer_document_id_column: DbColumnName,
    pub column_mappings: Vec<TriggerColumnMapping>,
}

/// Closed set of synthesized trigger kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriggerKind {
    /// Bumps `dms.Document` content (and identity) versions on row change.
    DocumentStamping,
    /// Maintains `dms.ReferentialIdentity` rows for the resource.
    ReferentialIdentityMaintenance {
        resource_key_id: i16,
        project_name: String,
        resource_name: String,
        identity_elements: Vec<IdentityElementMapping>,
        #[serde(default)]
        superclass_alias: Option<SuperclassAlias>,
    },
    /// Upserts into a superclass identity table.
    AbstractIdentityMaintenance {
        target_table: DbTableName,
        target_column_mappings: Vec<TriggerColumnMapping>,
        discriminator_value: String,
    },
    /// Cascades identity updates to referencing rows (SQL Server only).
    /// Lives on the referenced table; one `UPDATE` per referrer.
    IdentityPropagationFallback {
        referrer_updates: Vec<PropagationReferrerTarget>,
    },
}

impl TriggerKind {
    pub fn label(&self) -> &'static str {
        match self {
            TriggerKind::DocumentStamping => "DocumentStamping",
            TriggerKind::ReferentialIdentityMaintenance { .. } => "ReferentialIdentityMaintenance",
            TriggerKind::AbstractIdentityMaintenance { .. } => "AbstractIdentityMaintenance",
            TriggerKind::IdentityPropagationFallback { .. } => "IdentityPropagationFallback",
        }
    }
}

/// A trigger to synthesize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbTriggerInfo {
    pub name: DbTriggerName,
    pub table: DbTableName,
    #[serde(default)]
    pub key_columns: Vec<DbColumnName>,
    #[serde(default)]
    pub identity_projection_columns: Vec<DbColumnName>,
    pub kind: TriggerKind,
}
