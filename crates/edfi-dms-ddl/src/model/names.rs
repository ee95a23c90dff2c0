//! Validated database identifier value types.
//!
//! Construction validates through [`validate_identifier`]; deserialization
//! goes through the same path, so a loaded model never holds an empty or
//! NUL-bearing identifier.

use crate::core::identifier::validate_identifier;
use crate::error::{DdlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! identifier_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier.
            pub fn new(value: impl Into<String>) -> Result<Self> {
                let value = value.into();
                validate_identifier(&value)?;
                Ok(Self(value))
            }

            /// Wrap a compile-time constant known to be a valid identifier.
            pub(crate) fn from_static(value: &'static str) -> Self {
                Self(value.to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = DdlError;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier_type!(
    /// A database schema name (`edfi`, `dms`, `tpdm`).
    DbSchemaName
);

identifier_type!(
    /// A column name.
    DbColumnName
);

identifier_type!(
    /// An index name.
    DbIndexName
);

identifier_type!(
    /// A trigger name.
    DbTriggerName
);

/// A schema-qualified table (or view) name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTableName")]
pub struct DbTableName {
    schema: DbSchemaName,
    name: String,
}

#[derive(Deserialize)]
struct RawTableName {
    schema: DbSchemaName,
    name: String,
}

impl TryFrom<RawTableName> for DbTableName {
    type Error = DdlError;

    fn try_from(raw: RawTableName) -> Result<Self> {
        DbTableName::new(raw.schema, raw.name)
    }
}

impl DbTableName {
    pub fn new(schema: DbSchemaName, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name)?;
        Ok(Self { schema, name })
    }

    pub(crate) fn from_static(schema: &'static str, name: &'static str) -> Self {
        Self {
            schema: DbSchemaName::from_static(schema),
            name: name.to_string(),
        }
    }

    pub fn schema(&self) -> &DbSchemaName {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for DbTableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Project-qualified resource name (`Ed-Fi` / `School`).
///
/// These are literal values, not identifiers: they are written into SQL as
/// escaped string literals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedResourceName {
    pub project_name: String,
    pub resource_name: String,
}

impl QualifiedResourceName {
    pub fn new(project_name: impl Into<String>, resource_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            resource_name: resource_name.into(),
        }
    }

    /// Discriminator value stored in abstract identity tables.
    pub fn discriminator(&self) -> String {
        format!("{}:{}", self.project_name, self.resource_name)
    }
}

impl fmt::Display for QualifiedResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project_name, self.resource_name)
    }
}
