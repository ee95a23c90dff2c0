//! Configuration validation.

use super::DdlConfig;
use crate::error::{DdlError, Result};

/// Validate the configuration.
pub fn validate(config: &DdlConfig) -> Result<()> {
    if !config.sections.any() {
        return Err(DdlError::Config(
            "at least one of sections.core, sections.relational, sections.seed must be enabled"
                .into(),
        ));
    }

    if config.sections.relational && config.model.is_none() {
        return Err(DdlError::Config(
            "model is required when sections.relational is enabled".into(),
        ));
    }

    if config.sections.seed && config.model.is_none() && config.effective_schema.is_none() {
        return Err(DdlError::Config(
            "model or effective_schema is required when sections.seed is enabled".into(),
        ));
    }

    for (field, path) in [
        ("model", &config.model),
        ("effective_schema", &config.effective_schema),
        ("output", &config.output),
    ] {
        if let Some(path) = path {
            if path.as_os_str().is_empty() {
                return Err(DdlError::Config(format!("{} path cannot be empty", field)));
            }
        }
    }

    Ok(())
}
