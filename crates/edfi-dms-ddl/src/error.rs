//! Error types for DDL generation.

use crate::dialect::SqlDialectKind;
use thiserror::Error;

/// Exit code for configuration and input parse failures.
pub const EXIT_CONFIG_ERROR: u8 = 1;

/// Exit code for relational-model contract violations.
pub const EXIT_MODEL_ERROR: u8 = 2;

/// Exit code for file system failures.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for emission operations.
#[derive(Error, Debug)]
pub enum DdlError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The relational model violates an emitter precondition
    #[error("Invalid relational model: {0}")]
    InvalidModel(String),

    /// Model set was derived for a different dialect than the emitter targets
    #[error("Dialect mismatch: model={model}, emitter={emitter}")]
    DialectMismatch {
        model: SqlDialectKind,
        emitter: SqlDialectKind,
    },

    /// Unknown dialect name
    #[error("Unsupported dialect '{0}' (expected 'pgsql' or 'mssql')")]
    UnsupportedDialect(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DdlError {
    /// Create an InvalidModel error.
    pub fn invalid_model(message: impl Into<String>) -> Self {
        DdlError::InvalidModel(message.into())
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            DdlError::Config(_)
            | DdlError::UnsupportedDialect(_)
            | DdlError::Yaml(_)
            | DdlError::Json(_) => EXIT_CONFIG_ERROR,
            DdlError::InvalidModel(_) | DdlError::DialectMismatch { .. } => EXIT_MODEL_ERROR,
            DdlError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for emission operations.
pub type Result<T> = std::result::Result<T, DdlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(DdlError::Config("x".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(DdlError::invalid_model("x").exit_code(), EXIT_MODEL_ERROR);
        assert_eq!(
            DdlError::DialectMismatch {
                model: SqlDialectKind::Pgsql,
                emitter: SqlDialectKind::Mssql,
            }
            .exit_code(),
            EXIT_MODEL_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(DdlError::from(io).exit_code(), EXIT_IO_ERROR);
    }

    #[test]
    fn test_dialect_mismatch_message() {
        let err = DdlError::DialectMismatch {
            model: SqlDialectKind::Pgsql,
            emitter: SqlDialectKind::Mssql,
        };
        assert_eq!(err.to_string(), "Dialect mismatch: model=pgsql, emitter=mssql");
    }

    #[test]
    fn test_format_detailed_includes_cause() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let detailed = DdlError::from(json_err).format_detailed();
        assert!(detailed.starts_with("Error: JSON error:"));
    }
}
