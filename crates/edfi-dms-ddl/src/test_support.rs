//! Shared model builders for unit tests.

use crate::dialect::SqlDialectKind;
use crate::model::*;

pub(crate) fn column(name: &str) -> DbColumnName {
    DbColumnName::new(name).unwrap()
}

pub(crate) fn table_name(schema: &str, name: &str) -> DbTableName {
    DbTableName::new(DbSchemaName::new(schema).unwrap(), name).unwrap()
}

fn key(constraint_name: Option<&str>, columns: &[(&str, ColumnKind)]) -> TableKey {
    TableKey {
        constraint_name: constraint_name.map(str::to_string),
        columns: columns
            .iter()
            .map(|(name, kind)| DbKeyColumn {
                column_name: column(name),
                kind: *kind,
            })
            .collect(),
    }
}

fn fk(
    name: &str,
    columns: &[&str],
    target: DbTableName,
    target_columns: &[&str],
    on_delete: ReferentialAction,
) -> TableConstraint {
    TableConstraint::ForeignKey {
        name: name.to_string(),
        columns: columns.iter().map(|c| column(c)).collect(),
        target_table: target,
        target_columns: target_columns.iter().map(|c| column(c)).collect(),
        on_delete,
        on_update: ReferentialAction::NoAction,
    }
}

fn document_fk(name: &str, column_name: &str) -> TableConstraint {
    fk(
        name,
        &[column_name],
        table_name("dms", "Document"),
        &["DocumentId"],
        ReferentialAction::Cascade,
    )
}

pub(crate) fn sample_effective_schema() -> EffectiveSchemaInfo {
    let rk = |id: i16, resource: &str, is_abstract: bool| ResourceKeyEntry {
        resource_key_id: id,
        resource: QualifiedResourceName::new("Ed-Fi", resource),
        resource_version: "5.1.0".to_string(),
        is_abstract_resource: is_abstract,
    };

    EffectiveSchemaInfo {
        api_schema_format_version: "1.0.0".to_string(),
        relational_mapping_version: "v1".to_string(),
        effective_schema_hash: "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"
            .to_string(),
        resource_key_count: 3,
        resource_key_seed_hash: (0u8..32).collect(),
        schema_components_in_endpoint_order: vec![SchemaComponentInfo {
            project_endpoint_name: "ed-fi".to_string(),
            project_name: "Ed-Fi".to_string(),
            project_version: "5.1.0".to_string(),
            is_extension_project: false,
            project_hash: None,
        }],
        resource_keys_in_id_order: vec![
            rk(1, "EducationOrganization", true),
            rk(2, "LocalEducationAgency", false),
            rk(3, "School", false),
        ],
    }
}

fn local_education_agency() -> ConcreteResourceModel {
    let root = DbTableModel {
        table: table_name("edfi", "LocalEducationAgency"),
        json_scope: "$".to_string(),
        key: key(None, &[("DocumentId", ColumnKind::ParentKeyPart)]),
        columns: vec![
            DbColumnModel::key_part(column("DocumentId"), ColumnKind::ParentKeyPart),
            DbColumnModel::scalar(
                column("LocalEducationAgencyId"),
                RelationalScalarType::Int32,
                false,
            ),
            DbColumnModel::scalar(
                column("NameOfInstitution"),
                RelationalScalarType::string(75),
                false,
            ),
        ],
        constraints: vec![
            document_fk("FK_LocalEducationAgency_Document", "DocumentId"),
            TableConstraint::Unique {
                name: "UX_LocalEducationAgency_LocalEducationAgencyId".to_string(),
                columns: vec![column("LocalEducationAgencyId")],
            },
        ],
    };

    ConcreteResourceModel {
        resource_key_id: 2,
        storage_kind: ResourceStorageKind::RelationalTables,
        relational_model: RelationalResourceModel {
            resource: QualifiedResourceName::new("Ed-Fi", "LocalEducationAgency"),
            physical_schema: DbSchemaName::new("edfi").unwrap(),
            storage_kind: ResourceStorageKind::RelationalTables,
            root_table: root.table.clone(),
            tables_in_dependency_order: vec![root],
            document_reference_bindings: Vec::new(),
            descriptor_edge_sources: Vec::new(),
        },
    }
}

fn school() -> ConcreteResourceModel {
    let root = DbTableModel {
        table: table_name("edfi", "School"),
        json_scope: "$".to_string(),
        key: key(Some("PK_School"), &[("DocumentId", ColumnKind::ParentKeyPart)]),
        columns: vec![
            DbColumnModel::key_part(column("DocumentId"), ColumnKind::ParentKeyPart),
            DbColumnModel::scalar(column("SchoolId"), RelationalScalarType::Int32, false),
            DbColumnModel::scalar(
                column("NameOfInstitution"),
                RelationalScalarType::string(75),
                false,
            ),
            DbColumnModel {
                column_name: column("LocalEducationAgency_DocumentId"),
                kind: ColumnKind::DocumentFk,
                scalar_type: None,
                is_nullable: true,
                source_json_path: Some("$.localEducationAgencyReference".to_string()),
                target_resource: Some(QualifiedResourceName::new("Ed-Fi", "LocalEducationAgency")),
                computed: None,
            },
            DbColumnModel::scalar(
                column("LocalEducationAgency_LocalEducationAgencyId"),
                RelationalScalarType::Int32,
                true,
            ),
            DbColumnModel::scalar(
                column("WebSite"),
                RelationalScalarType::unbounded_string(),
                true,
            ),
        ],
        constraints: vec![
            document_fk("FK_School_Document", "DocumentId"),
            TableConstraint::Unique {
                name: "UX_School_SchoolId".to_string(),
                columns: vec![column("SchoolId")],
            },
            fk(
                "FK_School_LocalEducationAgency",
                &["LocalEducationAgency_DocumentId"],
                table_name("edfi", "LocalEducationAgency"),
                &["DocumentId"],
                ReferentialAction::NoAction,
            ),
            TableConstraint::AllOrNoneNullability {
                name: "CK_School_LocalEducationAgency_AllOrNone".to_string(),
                fk_column: column("LocalEducationAgency_DocumentId"),
                dependent_columns: vec![column("LocalEducationAgency_LocalEducationAgencyId")],
            },
        ],
    };

    let address = DbTableModel {
        table: table_name("edfi", "SchoolAddress"),
        json_scope: "$.addresses[*]".to_string(),
        key: key(
            Some("PK_SchoolAddress"),
            &[
                ("School_DocumentId", ColumnKind::ParentKeyPart),
                ("Ordinal", ColumnKind::Ordinal),
            ],
        ),
        columns: vec![
            DbColumnModel::key_part(column("School_DocumentId"), ColumnKind::ParentKeyPart),
            DbColumnModel::key_part(column("Ordinal"), ColumnKind::Ordinal),
            DbColumnModel::scalar(column("City"), RelationalScalarType::string(30), false),
            DbColumnModel::scalar(column("Latitude"), RelationalScalarType::decimal(9, 6), true),
        ],
        constraints: vec![fk(
            "FK_SchoolAddress_School",
            &["School_DocumentId"],
            table_name("edfi", "School"),
            &["DocumentId"],
            ReferentialAction::Cascade,
        )],
    };

    ConcreteResourceModel {
        resource_key_id: 3,
        storage_kind: ResourceStorageKind::RelationalTables,
        relational_model: RelationalResourceModel {
            resource: QualifiedResourceName::new("Ed-Fi", "School"),
            physical_schema: DbSchemaName::new("edfi").unwrap(),
            storage_kind: ResourceStorageKind::RelationalTables,
            root_table: root.table.clone(),
            tables_in_dependency_order: vec![root, address],
            document_reference_bindings: vec![DocumentReferenceBinding {
                reference_object_path: "$.localEducationAgencyReference".to_string(),
                table: table_name("edfi", "School"),
                fk_column: column("LocalEducationAgency_DocumentId"),
                target_resource: QualifiedResourceName::new("Ed-Fi", "LocalEducationAgency"),
            }],
            descriptor_edge_sources: Vec::new(),
        },
    }
}

fn education_organization_identity() -> AbstractIdentityTableInfo {
    AbstractIdentityTableInfo {
        abstract_resource_key_id: 1,
        resource: QualifiedResourceName::new("Ed-Fi", "EducationOrganization"),
        table_model: DbTableModel {
            table: table_name("edfi", "EducationOrganizationIdentity"),
            json_scope: "$".to_string(),
            key: key(
                Some("PK_EducationOrganizationIdentity"),
                &[("DocumentId", ColumnKind::ParentKeyPart)],
            ),
            columns: vec![
                DbColumnModel::key_part(column("DocumentId"), ColumnKind::ParentKeyPart),
                DbColumnModel::scalar(
                    column("EducationOrganizationId"),
                    RelationalScalarType::Int64,
                    false,
                ),
                DbColumnModel::scalar(
                    column("Discriminator"),
                    RelationalScalarType::string(256),
                    false,
                ),
            ],
            constraints: vec![document_fk(
                "FK_EducationOrganizationIdentity_Document",
                "DocumentId",
            )],
        },
    }
}

fn education_organization_view() -> AbstractUnionViewInfo {
    let arm = |rk: i16, table: &str, id_column: &str, discriminator: &str| AbstractUnionViewArm {
        concrete_member_resource_key_id: rk,
        from_table: table_name("edfi", table),
        projection_expressions: vec![
            ProjectionExpression::SourceColumn(column("DocumentId")),
            ProjectionExpression::SourceColumn(column(id_column)),
            ProjectionExpression::StringLiteral(discriminator.to_string()),
        ],
    };

    AbstractUnionViewInfo {
        abstract_resource_key_id: 1,
        view_name: table_name("edfi", "EducationOrganization"),
        output_columns: vec![
            AbstractUnionViewOutputColumn {
                column_name: column("DocumentId"),
                scalar_type: RelationalScalarType::Int64,
            },
            AbstractUnionViewOutputColumn {
                column_name: column("EducationOrganizationId"),
                scalar_type: RelationalScalarType::Int64,
            },
            AbstractUnionViewOutputColumn {
                column_name: column("Discriminator"),
                scalar_type: RelationalScalarType::string(256),
            },
        ],
        union_arms_in_order: vec![
            arm(
                2,
                "LocalEducationAgency",
                "LocalEducationAgencyId",
                "Ed-Fi:LocalEducationAgency",
            ),
            arm(3, "School", "SchoolId", "Ed-Fi:School"),
        ],
    }
}

fn triggers() -> Vec<DbTriggerInfo> {
    let stamp = |name: &str, table: &str, key: &str, identity: &[&str]| DbTriggerInfo {
        name: DbTriggerName::new(name).unwrap(),
        table: table_name("edfi", table),
        key_columns: vec![column(key)],
        identity_projection_columns: identity.iter().map(|c| column(c)).collect(),
        kind: TriggerKind::DocumentStamping,
    };

    vec![
        stamp(
            "TR_LocalEducationAgency_Stamp",
            "LocalEducationAgency",
            "DocumentId",
            &["LocalEducationAgencyId"],
        ),
        stamp("TR_School_Stamp", "School", "DocumentId", &["SchoolId"]),
        stamp("TR_SchoolAddress_Stamp", "SchoolAddress", "School_DocumentId", &[]),
        DbTriggerInfo {
            name: DbTriggerName::new("TR_School_ReferentialIdentity").unwrap(),
            table: table_name("edfi", "School"),
            key_columns: vec![column("DocumentId")],
            identity_projection_columns: vec![column("SchoolId")],
            kind: TriggerKind::ReferentialIdentityMaintenance {
                resource_key_id: 3,
                project_name: "Ed-Fi".to_string(),
                resource_name: "School".to_string(),
                identity_elements: vec![IdentityElementMapping {
                    column: column("SchoolId"),
                    identity_json_path: "$.schoolId".to_string(),
                }],
                superclass_alias: Some(SuperclassAlias {
                    resource_key_id: 1,
                    project_name: "Ed-Fi".to_string(),
                    resource_name: "EducationOrganization".to_string(),
                    identity_elements: vec![IdentityElementMapping {
                        column: column("SchoolId"),
                        identity_json_path: "$.educationOrganizationId".to_string(),
                    }],
                }),
            },
        },
        DbTriggerInfo {
            name: DbTriggerName::new("TR_School_AbstractIdentity").unwrap(),
            table: table_name("edfi", "School"),
            key_columns: vec![column("DocumentId")],
            identity_projection_columns: vec![column("SchoolId")],
            kind: TriggerKind::AbstractIdentityMaintenance {
                target_table: table_name("edfi", "EducationOrganizationIdentity"),
                target_column_mappings: vec![TriggerColumnMapping {
                    source_column: column("SchoolId"),
                    target_column: column("EducationOrganizationId"),
                }],
                discriminator_value: "Ed-Fi:School".to_string(),
            },
        },
    ]
}

/// Identity propagation from a LocalEducationAgency to the rows referencing it.
pub(crate) fn propagation_trigger() -> DbTriggerInfo {
    let referrer = |table: &str| PropagationReferrerTarget {
        referrer_table: table_name("edfi", table),
        referrer_document_id_column: column("LocalEducationAgency_DocumentId"),
        column_mappings: vec![TriggerColumnMapping {
            source_column: column("LocalEducationAgencyId"),
            target_column: column("LocalEducationAgency_LocalEducationAgencyId"),
        }],
    };

    DbTriggerInfo {
        name: DbTriggerName::new("TR_LocalEducationAgency_Propagation").unwrap(),
        table: table_name("edfi", "LocalEducationAgency"),
        key_columns: vec![column("DocumentId")],
        identity_projection_columns: vec![column("LocalEducationAgencyId")],
        kind: TriggerKind::IdentityPropagationFallback {
            referrer_updates: vec![referrer("School"), referrer("LocalEducationAgencyAccountability")],
        },
    }
}

/// School and LocalEducationAgency under the abstract EducationOrganization.
pub(crate) fn sample_model_set(dialect: SqlDialectKind) -> DerivedRelationalModelSet {
    DerivedRelationalModelSet {
        effective_schema: sample_effective_schema(),
        dialect,
        project_schemas_in_endpoint_order: vec![ProjectSchemaInfo {
            project_endpoint_name: "ed-fi".to_string(),
            project_name: "Ed-Fi".to_string(),
            project_version: "5.1.0".to_string(),
            is_extension_project: false,
            physical_schema: DbSchemaName::new("edfi").unwrap(),
        }],
        concrete_resources_in_name_order: vec![local_education_agency(), school()],
        abstract_identity_tables_in_name_order: vec![education_organization_identity()],
        abstract_union_views_in_name_order: vec![education_organization_view()],
        indexes_in_create_order: vec![
            DbIndexInfo {
                name: DbIndexName::new("IX_School_LocalEducationAgency_DocumentId").unwrap(),
                table: table_name("edfi", "School"),
                key_columns: vec![column("LocalEducationAgency_DocumentId")],
                is_unique: false,
                kind: DbIndexKind::ForeignKeySupport,
            },
            DbIndexInfo {
                name: DbIndexName::new("IX_LocalEducationAgency_NameOfInstitution").unwrap(),
                table: table_name("edfi", "LocalEducationAgency"),
                key_columns: vec![column("NameOfInstitution")],
                is_unique: false,
                kind: DbIndexKind::Explicit,
            },
        ],
        triggers_in_create_order: triggers(),
    }
}
