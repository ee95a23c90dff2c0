//! Per-dialect identifier limits and scalar type defaults.

use super::SqlDialectKind;
use crate::model::RelationalScalarType;
use sha2::{Digest, Sha256};
use tracing::warn;

/// Number of hex digits of the SHA-256 suffix appended to shortened names.
const SHORTEN_HASH_DIGITS: usize = 10;

/// Physical SQL type names used for each scalar kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarTypeDefaults {
    pub string_type: &'static str,
    pub unbounded_string_type: &'static str,
    pub int32_type: &'static str,
    pub int64_type: &'static str,
    pub decimal_type: &'static str,
    pub boolean_type: &'static str,
    pub date_type: &'static str,
    pub datetime_type: &'static str,
    pub time_type: &'static str,
}

impl ScalarTypeDefaults {
    /// Render a scalar type using these names.
    pub fn render(&self, scalar_type: &RelationalScalarType) -> String {
        match scalar_type {
            RelationalScalarType::String {
                max_length: Some(n),
            } => format!("{}({})", self.string_type, n),
            RelationalScalarType::String { max_length: None } => {
                self.unbounded_string_type.to_string()
            }
            RelationalScalarType::Decimal {
                precision_scale: Some((p, s)),
            } => format!("{}({},{})", self.decimal_type, p, s),
            RelationalScalarType::Decimal {
                precision_scale: None,
            } => self.decimal_type.to_string(),
            RelationalScalarType::Int32 => self.int32_type.to_string(),
            RelationalScalarType::Int64 => self.int64_type.to_string(),
            RelationalScalarType::Boolean => self.boolean_type.to_string(),
            RelationalScalarType::Date => self.date_type.to_string(),
            RelationalScalarType::DateTime => self.datetime_type.to_string(),
            RelationalScalarType::Time => self.time_type.to_string(),
        }
    }
}

/// Shared dialect rules consumed by the dialects and emitters.
pub trait DialectRules: Send + Sync {
    /// The dialect these rules describe.
    fn kind(&self) -> SqlDialectKind;

    /// Maximum identifier length, measured by [`identifier_length`](Self::identifier_length).
    fn max_identifier_length(&self) -> usize;

    /// Length of an identifier in the unit the engine limits: UTF-8 bytes by
    /// default.
    fn identifier_length(&self, name: &str) -> usize {
        name.len()
    }

    /// Scalar type names for this dialect.
    fn scalar_type_defaults(&self) -> &'static ScalarTypeDefaults;

    /// Shorten an identifier to fit [`max_identifier_length`](Self::max_identifier_length).
    ///
    /// Names that fit are returned unchanged. Longer names are truncated on a
    /// character boundary and suffixed with `_` plus the first ten hex digits
    /// of the SHA-256 of the full name, so distinct long names stay distinct.
    fn shorten_identifier(&self, name: &str) -> String {
        let max = self.max_identifier_length();
        if self.identifier_length(name) <= max {
            return name.to_string();
        }

        let digest = hex::encode(Sha256::digest(name.as_bytes()));
        let suffix = &digest[..SHORTEN_HASH_DIGITS];

        // The suffix is ASCII, so bytes and characters agree for it.
        let budget = max.saturating_sub(SHORTEN_HASH_DIGITS + 1);
        let mut cut = 0;
        for (index, ch) in name.char_indices() {
            let end = index + ch.len_utf8();
            if self.identifier_length(&name[..end]) > budget {
                break;
            }
            cut = end;
        }

        let shortened = format!("{}_{}", &name[..cut], suffix);
        warn!(
            original = name,
            shortened = %shortened,
            limit = max,
            "Identifier exceeds dialect limit, shortened"
        );
        shortened
    }
}

static PGSQL_SCALAR_DEFAULTS: ScalarTypeDefaults = ScalarTypeDefaults {
    string_type: "varchar",
    unbounded_string_type: "varchar",
    int32_type: "integer",
    int64_type: "bigint",
    decimal_type: "numeric",
    boolean_type: "boolean",
    date_type: "date",
    datetime_type: "timestamp with time zone",
    time_type: "time",
};

static MSSQL_SCALAR_DEFAULTS: ScalarTypeDefaults = ScalarTypeDefaults {
    string_type: "nvarchar",
    unbounded_string_type: "nvarchar(max)",
    int32_type: "int",
    int64_type: "bigint",
    decimal_type: "decimal",
    boolean_type: "bit",
    date_type: "date",
    datetime_type: "datetime2(7)",
    time_type: "time(7)",
};

/// PostgreSQL rules: 63-byte identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PgsqlRules;

impl DialectRules for PgsqlRules {
    fn kind(&self) -> SqlDialectKind {
        SqlDialectKind::Pgsql
    }

    fn max_identifier_length(&self) -> usize {
        63
    }

    fn scalar_type_defaults(&self) -> &'static ScalarTypeDefaults {
        &PGSQL_SCALAR_DEFAULTS
    }
}

/// SQL Server rules: 128-character identifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MssqlRules;

impl DialectRules for MssqlRules {
    fn kind(&self) -> SqlDialectKind {
        SqlDialectKind::Mssql
    }

    fn max_identifier_length(&self) -> usize {
        128
    }

    /// `sysname` is `nvarchar(128)`: the limit counts characters.
    fn identifier_length(&self, name: &str) -> usize {
        name.chars().count()
    }

    fn scalar_type_defaults(&self) -> &'static ScalarTypeDefaults {
        &MSSQL_SCALAR_DEFAULTS
    }
}

/// Closed set of rules instances, for building a dialect from rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectRulesImpl {
    Pgsql(PgsqlRules),
    Mssql(MssqlRules),
}

impl DialectRulesImpl {
    pub fn for_kind(kind: SqlDialectKind) -> Self {
        match kind {
            SqlDialectKind::Pgsql => DialectRulesImpl::Pgsql(PgsqlRules),
            SqlDialectKind::Mssql => DialectRulesImpl::Mssql(MssqlRules),
        }
    }
}

impl DialectRules for DialectRulesImpl {
    fn kind(&self) -> SqlDialectKind {
        match self {
            DialectRulesImpl::Pgsql(r) => r.kind(),
            DialectRulesImpl::Mssql(r) => r.kind(),
        }
    }

    fn max_identifier_length(&self) -> usize {
        match self {
            DialectRulesImpl::Pgsql(r) => r.max_identifier_length(),
            DialectRulesImpl::Mssql(r) => r.max_identifier_length(),
        }
    }

    fn identifier_length(&self, name: &str) -> usize {
        match self {
            DialectRulesImpl::Pgsql(r) => r.identifier_length(name),
            DialectRulesImpl::Mssql(r) => r.identifier_length(name),
        }
    }

    fn scalar_type_defaults(&self) -> &'static ScalarTypeDefaults {
        match self {
            DialectRulesImpl::Pgsql(r) => r.scalar_type_defaults(),
            DialectRulesImpl::Mssql(r) => r.scalar_type_defaults(),
        }
    }
}

impl From<PgsqlRules> for DialectRulesImpl {
    fn from(rules: PgsqlRules) -> Self {
        DialectRulesImpl::Pgsql(rules)
    }
}

impl From<MssqlRules> for DialectRulesImpl {
    fn from(rules: MssqlRules) -> Self {
        DialectRulesImpl::Mssql(rules)
    }
}
