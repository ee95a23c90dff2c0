//! Configuration loading and validation.
//!
//! ```yaml
//! dialect: pgsql
//! model: build/relational-model.json
//! output: build/deploy.sql
//! sections:
//!   core: true
//!   relational: true
//!   seed: true
//! ```

mod types;
mod validation;

pub use types::*;

use crate::emit::DdlScript;
use crate::error::Result;
use crate::model::{DerivedRelationalModelSet, EffectiveSchemaInfo};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info};

impl DdlConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: DdlConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// SHA-256 of the normalized configuration, for tying output to its inputs.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Load the configured inputs and render the selected sections.
    pub fn emit(&self) -> Result<String> {
        self.validate()?;
        info!(dialect = %self.dialect, config_hash = %self.hash(), "Emitting deployment script");

        let model_set = match &self.model {
            Some(path) => {
                debug!(path = %path.display(), "Loading relational model");
                Some(DerivedRelationalModelSet::load(path)?)
            }
            None => None,
        };

        let standalone_schema = match (&model_set, &self.effective_schema) {
            (None, Some(path)) if self.sections.seed => {
                debug!(path = %path.display(), "Loading effective schema");
                Some(EffectiveSchemaInfo::load(path)?)
            }
            _ => None,
        };

        let mut script = DdlScript::new(self.dialect).with_core(self.sections.core);
        if let Some(set) = &model_set {
            if self.sections.relational {
                script = script.with_relational(set);
            }
            if self.sections.seed {
                script = script.with_seed(&set.effective_schema);
            }
        }
        if let Some(schema) = &standalone_schema {
            script = script.with_seed(schema);
        }

        script.emit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqlDialectKind;
    use crate::error::DdlError;
    use crate::test_support::{sample_effective_schema, sample_model_set};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json<T: serde::Serialize>(value: &T) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(serde_json::to_string_pretty(value).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[test]
    fn test_from_yaml_defaults() {
        let config = DdlConfig::from_yaml("dialect: mssql\nmodel: model.json\n").unwrap();
        assert_eq!(config.dialect, SqlDialectKind::Mssql);
        assert_eq!(config.sections, SectionsConfig::default());
        assert!(config.output.is_none());
    }

    #[test]
    fn test_from_yaml_rejects_unknown_dialect() {
        let err = DdlConfig::from_yaml("dialect: oracle\nmodel: model.json\n").unwrap_err();
        assert!(matches!(err, DdlError::Yaml(_)));
    }

    #[test]
    fn test_from_yaml_runs_validation() {
        let err = DdlConfig::from_yaml("dialect: pgsql\n").unwrap_err();
        assert!(matches!(err, DdlError::Config(_)));
    }

    #[test]
    fn test_hash_is_stable_and_sensitive() {
        let a = DdlConfig::from_yaml("dialect: pgsql\nmodel: a.json\n").unwrap();
        let b = DdlConfig::from_yaml("dialect: pgsql\nmodel: a.json\n").unwrap();
        let c = DdlConfig::from_yaml("dialect: pgsql\nmodel: b.json\n").unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert_eq!(a.hash().len(), 64);
    }

    #[test]
    fn test_emit_from_model_file() {
        let model = write_json(&sample_model_set(SqlDialectKind::Pgsql));
        let mut config = DdlConfig::new(SqlDialectKind::Pgsql);
        config.model = Some(model.path().to_path_buf());

        let sql = config.emit().unwrap();
        assert!(sql.contains("CREATE SCHEMA IF NOT EXISTS \"dms\";"));
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS \"edfi\".\"School\""));
        assert!(sql.contains("-- Phase 7: Seed Data"));
    }

    #[test]
    fn test_emit_seed_from_effective_schema_file() {
        let schema = write_json(&sample_effective_schema());
        let mut config = DdlConfig::new(SqlDialectKind::Mssql);
        config.sections.core = false;
        config.sections.relational = false;
        config.effective_schema = Some(schema.path().to_path_buf());

        let sql = config.emit().unwrap();
        assert!(sql.starts_with("-- ==="));
        assert!(sql.contains("INSERT INTO [dms].[ResourceKey]"));
        assert!(!sql.contains("CREATE TABLE"));
    }

    #[test]
    fn test_emit_missing_model_file() {
        let mut config = DdlConfig::new(SqlDialectKind::Pgsql);
        config.model = Some("/nonexistent/model.json".into());
        let err = config.emit().unwrap_err();
        assert!(matches!(err, DdlError::Io(_)));
    }
}
