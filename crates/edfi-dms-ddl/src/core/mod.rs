//! Shared low-level helpers.

pub mod identifier;

pub use identifier::{escape_string_literal, validate_identifier, MAX_IDENTIFIER_LENGTH};
