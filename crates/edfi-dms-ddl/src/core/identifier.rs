//! Identifier validation and raw quoting helpers.
//!
//! Identifiers in the relational model (schemas, tables, columns, constraint
//! names) are interpolated into generated SQL text. They are never trusted
//! as-is: every identifier is validated once when the model value is built,
//! and every interpolation goes through dialect quoting that escapes the
//! closing delimiter.
//!
//! String literal values (project names, discriminators, hashes) go through
//! [`escape_string_literal`] instead.

use crate::error::{DdlError, Result};

/// Maximum identifier length accepted in the model.
/// - PostgreSQL: 63 bytes (longer generated names are shortened by the rules)
/// - SQL Server: 128 characters
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes
/// - Identifiers exceeding [`MAX_IDENTIFIER_LENGTH`] bytes
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DdlError::invalid_model("Identifier cannot be empty"));
    }

    if name.contains('\0') {
        return Err(DdlError::invalid_model(format!(
            "Identifier contains null byte: {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(DdlError::invalid_model(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a PostgreSQL identifier.
///
/// ```ignore
/// assert_eq!(quote_pg("users"), "\"users\"");
/// assert_eq!(quote_pg("table\"name"), "\"table\"\"name\"");
/// ```
pub fn quote_pg(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL Server identifier using brackets.
///
/// ```ignore
/// assert_eq!(quote_mssql("users"), "[users]");
/// assert_eq!(quote_mssql("table]name"), "[table]]name]");
/// ```
pub fn quote_mssql(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// Escape a value for embedding between single quotes.
///
/// Assumes `standard_conforming_strings = on` for PostgreSQL, so backslashes
/// are literal and only single quotes need doubling.
pub fn escape_string_literal(value: &str) -> String {
    value.replace('\'', "''")
}
