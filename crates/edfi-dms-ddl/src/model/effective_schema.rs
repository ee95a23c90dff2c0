//! Effective schema contract seeded into the `dms` schema.

use super::names::QualifiedResourceName;
use crate::error::{DdlError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Length in bytes of `ResourceKeySeedHash`.
pub const SEED_HASH_LENGTH: usize = 32;

/// A short, stable id assigned to a (project, resource, version) tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceKeyEntry {
    pub resource_key_id: i16,
    pub resource: QualifiedResourceName,
    pub resource_version: String,
    #[serde(default)]
    pub is_abstract_resource: bool,
}

/// One project participating in the effective schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaComponentInfo {
    pub project_endpoint_name: String,
    pub project_name: String,
    pub project_version: String,
    #[serde(default)]
    pub is_extension_project: bool,
    /// Hash of the project's own schema; not seeded, carried for callers.
    #[serde(default)]
    pub project_hash: Option<String>,
}

/// The versioned, hashed contract a deployment expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveSchemaInfo {
    pub api_schema_format_version: String,
    pub relational_mapping_version: String,
    pub effective_schema_hash: String,
    pub resource_key_count: i16,
    #[serde(with = "hex_bytes")]
    pub resource_key_seed_hash: Vec<u8>,
    pub schema_components_in_endpoint_order: Vec<SchemaComponentInfo>,
    pub resource_keys_in_id_order: Vec<ResourceKeyEntry>,
}

impl EffectiveSchemaInfo {
    /// Load from a JSON or YAML file, chosen by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let info: Self = super::load_document(path.as_ref())?;
        info.validate()?;
        Ok(info)
    }

    /// Check the contract is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.resource_key_seed_hash.len() != SEED_HASH_LENGTH {
            return Err(DdlError::invalid_model(format!(
                "ResourceKeySeedHash must be {} bytes (got {})",
                SEED_HASH_LENGTH,
                self.resource_key_seed_hash.len()
            )));
        }

        if usize::try_from(self.resource_key_count).ok()
            != Some(self.resource_keys_in_id_order.len())
        {
            return Err(DdlError::invalid_model(format!(
                "ResourceKeyCount {} does not match {} resource keys",
                self.resource_key_count,
                self.resource_keys_in_id_order.len()
            )));
        }

        for pair in self.resource_keys_in_id_order.windows(2) {
            if pair[0].resource_key_id >= pair[1].resource_key_id {
                return Err(DdlError::invalid_model(format!(
                    "Resource keys must be in ascending id order ({} precedes {})",
                    pair[0].resource_key_id, pair[1].resource_key_id
                )));
            }
        }

        if self.effective_schema_hash.is_empty() {
            return Err(DdlError::invalid_model("EffectiveSchemaHash cannot be empty"));
        }

        Ok(())
    }
}

/// Serde adapter carrying bytes as a hex string.
mod hex_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        let trimmed = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(&text);
        hex::decode(trimmed).map_err(serde::de::Error::custom)
    }
}
