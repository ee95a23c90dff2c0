//! End-to-end emission tests against the School fixture model.
//!
//! The fixture is loaded through the public file loaders, so these tests also
//! cover the JSON and YAML model formats.

use edfi_dms_ddl::identity::{referential_id, IdentityElement};
use edfi_dms_ddl::{
    CoreDdlEmitter, DdlError, DdlScript, DerivedRelationalModelSet, EffectiveSchemaInfo,
    RelationalModelDdlEmitter, SeedDmlEmitter, SqlDialectKind,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_model(kind: SqlDialectKind) -> DerivedRelationalModelSet {
    let mut set = DerivedRelationalModelSet::load(fixture("school_model.json")).unwrap();
    set.dialect = kind;
    set
}

fn full_script(kind: SqlDialectKind) -> String {
    let set = load_model(kind);
    DdlScript::new(kind)
        .with_relational(&set)
        .with_seed(&set.effective_schema)
        .emit()
        .unwrap()
}

fn position(sql: &str, needle: &str) -> usize {
    sql.find(needle)
        .unwrap_or_else(|| panic!("missing {:?} in output", needle))
}

const DIALECTS: [SqlDialectKind; 2] = [SqlDialectKind::Pgsql, SqlDialectKind::Mssql];

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_fixture_model_loads_and_validates() {
    let set = load_model(SqlDialectKind::Pgsql);
    assert!(set.validate().is_ok());
    assert_eq!(set.concrete_resources_in_name_order.len(), 2);
    assert_eq!(set.all_tables().count(), 4);
    assert_eq!(set.triggers_in_create_order.len(), 5);
}

#[test]
fn test_fixture_effective_schema_yaml_loads() {
    let schema = EffectiveSchemaInfo::load(fixture("school_effective_schema.yaml")).unwrap();
    let from_model = load_model(SqlDialectKind::Pgsql).effective_schema;
    assert_eq!(schema, from_model);
}

// =============================================================================
// Determinism and canonical form
// =============================================================================

#[test]
fn test_full_script_is_byte_identical_across_runs() {
    for kind in DIALECTS {
        assert_eq!(full_script(kind), full_script(kind));
    }
}

#[test]
fn test_full_script_canonical_form() {
    for kind in DIALECTS {
        let sql = full_script(kind);
        assert!(!sql.contains('\r'), "{} output has CR", kind);
        assert!(!sql.contains('\t'), "{} output has tabs", kind);
        for line in sql.lines() {
            assert_eq!(line, line.trim_end(), "trailing whitespace in {:?}", line);
        }
        assert!(sql.ends_with('\n'));
    }
}

#[test]
fn test_core_phases_in_order() {
    for kind in DIALECTS {
        let sql = full_script(kind);
        let phases: Vec<usize> = (1..=7)
            .map(|n| position(&sql, &format!("-- Phase {}:", n)))
            .collect();
        assert!(phases.windows(2).all(|w| w[0] < w[1]), "{} phases out of order", kind);
    }
}

#[test]
fn test_relational_section_between_core_and_seed() {
    let sql = full_script(SqlDialectKind::Pgsql);
    let core_triggers = position(&sql, "-- Phase 6:");
    let relational = position(&sql, "CREATE SCHEMA IF NOT EXISTS \"edfi\";");
    let seed = position(&sql, "-- Phase 7:");
    assert!(core_triggers < relational && relational < seed);
}

// =============================================================================
// Idempotency guards
// =============================================================================

#[test]
fn test_pgsql_creates_are_guarded() {
    let sql = full_script(SqlDialectKind::Pgsql);
    for line in sql.lines() {
        if line.starts_with("CREATE TABLE") {
            assert!(line.starts_with("CREATE TABLE IF NOT EXISTS"), "{:?}", line);
        }
        if line.starts_with("CREATE INDEX") || line.starts_with("CREATE UNIQUE INDEX") {
            assert!(line.contains("IF NOT EXISTS"), "{:?}", line);
        }
        if line.starts_with("CREATE TRIGGER") {
            let trigger = line.trim_start_matches("CREATE TRIGGER ");
            assert!(
                sql.contains(&format!("DROP TRIGGER IF EXISTS {} ON", trigger)),
                "{:?} has no drop guard",
                line
            );
        }
    }
}

#[test]
fn test_mssql_creates_are_guarded() {
    let sql = full_script(SqlDialectKind::Mssql);
    let lines: Vec<&str> = sql.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("CREATE TABLE") {
            assert!(
                i > 0 && lines[i - 1].starts_with("IF OBJECT_ID("),
                "{:?} is not guarded",
                line
            );
        }
    }
    assert!(!sql.contains("\nCREATE VIEW"));
    assert!(!sql.contains("\nCREATE TRIGGER"));
    assert!(sql.contains("CREATE OR ALTER VIEW [edfi].[EducationOrganization]"));
    assert!(sql.contains("CREATE OR ALTER TRIGGER [edfi].[TR_School_ReferentialIdentity]"));
}

/// Statements SQL Server requires to be alone in their batch.
const BATCH_OWNING: [&str; 4] = [
    "CREATE OR ALTER VIEW",
    "CREATE OR ALTER TRIGGER",
    "CREATE OR ALTER FUNCTION",
    "CREATE FUNCTION",
];

/// Column-0 keywords that start a new top-level T-SQL statement.
const STATEMENT_STARTS: [&str; 7] = ["IF ", "CREATE ", "ALTER ", "INSERT ", "DECLARE ", "EXEC", "DROP "];

#[test]
fn test_mssql_batch_owning_statements_stand_alone() {
    let sql = full_script(SqlDialectKind::Mssql);
    let mut owning_batches = 0;

    for batch in sql.split("\nGO\n") {
        let top_level: Vec<&str> = batch
            .lines()
            .filter(|line| !line.is_empty() && !line.starts_with(' ') && !line.starts_with("--"))
            .collect();
        let owning = top_level
            .iter()
            .position(|line| BATCH_OWNING.iter().any(|kw| line.starts_with(kw)));
        let Some(index) = owning else { continue };
        owning_batches += 1;

        assert_eq!(index, 0, "statement precedes {:?} in its batch", top_level[index]);
        for line in &top_level[1..] {
            assert!(
                !STATEMENT_STARTS.iter().any(|kw| line.starts_with(kw)),
                "{:?} shares a batch with {:?}",
                line,
                top_level[0]
            );
        }
    }

    // uuidv5 function, journal trigger, one view, five model triggers
    assert_eq!(owning_batches, 8);
}

#[test]
fn test_mssql_index_ddl_outside_view_batch() {
    let sql = full_script(SqlDialectKind::Mssql);
    let view_batch = sql
        .split("\nGO\n")
        .find(|batch| batch.contains("CREATE OR ALTER VIEW"))
        .unwrap();
    assert!(!view_batch.contains("CREATE INDEX"));
    assert!(sql.contains("CREATE INDEX [IX_School_LocalEducationAgency_DocumentId]"));
}

// =============================================================================
// Dialect exclusivity
// =============================================================================

#[test]
fn test_pgsql_script_has_no_mssql_syntax() {
    let sql = full_script(SqlDialectKind::Pgsql);
    for token in ["GO\n", "[dms]", "[edfi]", "N'", "sys.", "SET NOCOUNT ON", "nvarchar"] {
        assert!(!sql.contains(token), "unexpected {:?}", token);
    }
}

#[test]
fn test_mssql_script_has_no_pgsql_syntax() {
    let sql = full_script(SqlDialectKind::Mssql);
    for token in ["\"dms\"", "\"edfi\"", "plpgsql", "IF NOT EXISTS \"", "$trigger$", "::"] {
        assert!(!sql.contains(token), "unexpected {:?}", token);
    }
}

// =============================================================================
// Relational content
// =============================================================================

#[test]
fn test_foreign_keys_follow_every_table() {
    for kind in DIALECTS {
        let set = load_model(kind);
        let sql = RelationalModelDdlEmitter::new(kind).emit(&set).unwrap();
        let last_table = position(&sql, "EducationOrganizationIdentity");
        let first_fk = position(&sql, "FK_LocalEducationAgency_Document");
        assert!(last_table < first_fk, "{} emits a foreign key before all tables", kind);
        assert_eq!(sql.matches("FOREIGN KEY").count(), 5);
    }
}

#[test]
fn test_referential_identity_trigger_uses_host_name_format() {
    let set = load_model(SqlDialectKind::Pgsql);
    let sql = RelationalModelDdlEmitter::new(SqlDialectKind::Pgsql)
        .emit(&set)
        .unwrap();
    assert!(sql.contains("'Ed-FiSchool'"));
    assert!(sql.contains("'$$.schoolId='"));
    assert!(sql.contains("'Ed-FiEducationOrganization'"));
    assert!(sql.contains("'$$.educationOrganizationId='"));

    let id = referential_id(
        "Ed-Fi",
        "School",
        &[IdentityElement::new("$.schoolId", "255901")],
    );
    assert_eq!(id.get_version_num(), 5);
}

#[test]
fn test_model_dialect_must_match_emitter() {
    let set = load_model(SqlDialectKind::Pgsql);
    let err = RelationalModelDdlEmitter::new(SqlDialectKind::Mssql)
        .emit(&set)
        .unwrap_err();
    assert!(matches!(err, DdlError::DialectMismatch { .. }));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_invalid_model_is_reported_before_emission() {
    let mut set = load_model(SqlDialectKind::Mssql);
    set.abstract_union_views_in_name_order[0]
        .union_arms_in_order
        .clear();
    let err = RelationalModelDdlEmitter::new(SqlDialectKind::Mssql)
        .emit(&set)
        .unwrap_err();
    assert!(matches!(err, DdlError::InvalidModel(_)));
    assert!(err.to_string().contains("EducationOrganization"));
}

// =============================================================================
// Standalone emitters
// =============================================================================

#[test]
fn test_core_ddl_independent_of_model() {
    for kind in DIALECTS {
        let core = CoreDdlEmitter::new(kind).emit().unwrap();
        assert!(full_script(kind).starts_with(&core));
    }
}

#[test]
fn test_seed_dml_matches_between_model_and_file() {
    let schema = EffectiveSchemaInfo::load(fixture("school_effective_schema.yaml")).unwrap();
    for kind in DIALECTS {
        let from_file = SeedDmlEmitter::new(kind).emit(&schema).unwrap();
        assert!(full_script(kind).ends_with(&from_file));
    }
}
