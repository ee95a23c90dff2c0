//! Table-level model: scalar types, columns, keys and constraints.

use super::names::{DbColumnName, DbTableName, QualifiedResourceName};
use serde::{Deserialize, Serialize};

/// Closed set of scalar kinds a relational column can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Int32,
    Int64,
    String,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
}

/// A column's scalar type.
///
/// Length only exists on `String` and precision/scale only on `Decimal`, so
/// a length on an integer is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RelationalScalarType {
    Int32,
    Int64,
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<u32>,
    },
    Decimal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision_scale: Option<(u16, u16)>,
    },
    Boolean,
    Date,
    DateTime,
    Time,
}

impl RelationalScalarType {
    pub fn string(max_length: u32) -> Self {
        RelationalScalarType::String {
            max_length: Some(max_length),
        }
    }

    pub fn unbounded_string() -> Self {
        RelationalScalarType::String { max_length: None }
    }

    pub fn decimal(precision: u16, scale: u16) -> Self {
        RelationalScalarType::Decimal {
            precision_scale: Some((precision, scale)),
        }
    }

    pub fn kind(&self) -> ScalarKind {
        match self {
            RelationalScalarType::Int32 => ScalarKind::Int32,
            RelationalScalarType::Int64 => ScalarKind::Int64,
            RelationalScalarType::String { .. } => ScalarKind::String,
            RelationalScalarType::Decimal { .. } => ScalarKind::Decimal,
            RelationalScalarType::Boolean => ScalarKind::Boolean,
            RelationalScalarType::Date => ScalarKind::Date,
            RelationalScalarType::DateTime => ScalarKind::DateTime,
            RelationalScalarType::Time => ScalarKind::Time,
        }
    }
}

/// Role a column plays in its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Plain value column mapped from a JSON scalar.
    Scalar,
    /// Ancestor key column propagated unchanged into a descendant table.
    ParentKeyPart,
    /// Array position of the row within its parent collection.
    Ordinal,
    /// Foreign key to another document (`dms.Document.DocumentId`).
    DocumentFk,
    /// Foreign key to a descriptor document.
    DescriptorFk,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbColumnModel {
    pub column_name: DbColumnName,
    pub kind: ColumnKind,
    /// Absent for key-like kinds whose type is fixed by the dialect.
    #[serde(default)]
    pub scalar_type: Option<RelationalScalarType>,
    pub is_nullable: bool,
    #[serde(default)]
    pub source_json_path: Option<String>,
    #[serde(default)]
    pub target_resource: Option<QualifiedResourceName>,
    /// Present when the column is a persisted alias of another column.
    #[serde(default)]
    pub computed: Option<UnifiedAlias>,
}

/// A computed column mirroring a canonical column, gated by a presence column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedAlias {
    pub canonical_column: DbColumnName,
    #[serde(default)]
    pub presence_column: Option<DbColumnName>,
}

impl DbColumnModel {
    pub fn scalar(name: DbColumnName, scalar_type: RelationalScalarType, is_nullable: bool) -> Self {
        Self {
            column_name: name,
            kind: ColumnKind::Scalar,
            scalar_type: Some(scalar_type),
            is_nullable,
            source_json_path: None,
            target_resource: None,
            computed: None,
        }
    }

    pub fn key_part(name: DbColumnName, kind: ColumnKind) -> Self {
        Self {
            column_name: name,
            kind,
            scalar_type: None,
            is_nullable: false,
            source_json_path: None,
            target_resource: None,
            computed: None,
        }
    }
}

/// One column of a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbKeyColumn {
    pub column_name: DbColumnName,
    pub kind: ColumnKind,
}

/// Primary key of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableKey {
    /// Falls back to `PK_{schema}_{table}` (shortened) when absent.
    #[serde(default)]
    pub constraint_name: Option<String>,
    pub columns: Vec<DbKeyColumn>,
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Cascade,
}

/// Closed set of table-level constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TableConstraint {
    ForeignKey {
        name: String,
        columns: Vec<DbColumnName>,
        target_table: DbTableName,
        target_columns: Vec<DbColumnName>,
        #[serde(default)]
        on_delete: ReferentialAction,
        #[serde(default)]
        on_update: ReferentialAction,
    },
    Unique {
        name: String,
        columns: Vec<DbColumnName>,
    },
    /// Free-form check; the expression is emitted verbatim.
    Check {
        name: String,
        expression: String,
    },
    /// Either the FK column is NULL or every dependent column is NOT NULL.
    AllOrNoneNullability {
        name: String,
        fk_column: DbColumnName,
        dependent_columns: Vec<DbColumnName>,
    },
}

impl TableConstraint {
    pub fn name(&self) -> &str {
        match self {
            TableConstraint::ForeignKey { name, .. }
            | TableConstraint::Unique { name, .. }
            | TableConstraint::Check { name, .. }
            | TableConstraint::AllOrNoneNullability { name, .. } => name,
        }
    }

    /// Columns of this table the constraint refers to.
    pub fn local_columns(&self) -> Vec<&DbColumnName> {
        match self {
            TableConstraint::ForeignKey { columns, .. } | TableConstraint::Unique { columns, .. } => {
                columns.iter().collect()
            }
            TableConstraint::Check { .. } => Vec::new(),
            TableConstraint::AllOrNoneNullability {
                fk_column,
                dependent_columns,
                ..
            } => std::iter::once(fk_column).chain(dependent_columns.iter()).collect(),
        }
    }
}

/// A physical table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbTableModel {
    pub table: DbTableName,
    /// JSON path of the document scope the table stores (`$`, `$.addresses[*]`).
    pub json_scope: String,
    pub key: TableKey,
    pub columns: Vec<DbColumnModel>,
    #[serde(default)]
    pub constraints: Vec<TableConstraint>,
}

impl DbTableModel {
    pub fn column(&self, name: &DbColumnName) -> Option<&DbColumnModel> {
        self.columns.iter().find(|c| &c.column_name == name)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &TableConstraint> {
        self.constraints
            .iter()
            .filter(|c| matches!(c, TableConstraint::ForeignKey { .. }))
    }
}
