//! Configuration type definitions.

use crate::dialect::SqlDialectKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DdlConfig {
    /// Target engine (`pgsql` or `mssql`).
    pub dialect: SqlDialectKind,

    /// Derived relational model set (JSON or YAML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<PathBuf>,

    /// Effective schema file, used for seed DML when no model is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_schema: Option<PathBuf>,

    /// Output file. Stdout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// Script sections to emit.
    #[serde(default)]
    pub sections: SectionsConfig,
}

impl DdlConfig {
    /// A configuration with every section enabled and no inputs.
    pub fn new(dialect: SqlDialectKind) -> Self {
        Self {
            dialect,
            model: None,
            effective_schema: None,
            output: None,
            sections: SectionsConfig::default(),
        }
    }
}

/// Which parts of the deployment script to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionsConfig {
    /// Core `dms.*` DDL (default: true).
    #[serde(default = "default_true")]
    pub core: bool,

    /// Relational DDL for the model (default: true).
    #[serde(default = "default_true")]
    pub relational: bool,

    /// Seed DML for the effective schema (default: true).
    #[serde(default = "default_true")]
    pub seed: bool,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            core: true,
            relational: true,
            seed: true,
        }
    }
}

impl SectionsConfig {
    pub fn any(&self) -> bool {
        self.core || self.relational || self.seed
    }
}

fn default_true() -> bool {
    true
}
