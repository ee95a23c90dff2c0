//! CLI integration tests for edfi-dms-ddl.
//!
//! These tests verify command-line argument parsing, help output,
//! emitted SQL on stdout and in files, and exit codes for error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;

/// Get a command for the edfi-dms-ddl binary.
fn cmd() -> Command {
    Command::cargo_bin("edfi-dms-ddl").unwrap()
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../edfi-dms-ddl/tests/fixtures")
        .join(name)
}

/// The School fixture model rewritten for SQL Server.
fn mssql_model() -> tempfile::NamedTempFile {
    let json = std::fs::read_to_string(fixture("school_model.json")).unwrap();
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(
        json.replace("\"dialect\": \"pgsql\"", "\"dialect\": \"mssql\"")
            .as_bytes(),
    )
    .unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("emit"))
        .stdout(predicate::str::contains("core"))
        .stdout(predicate::str::contains("seed"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("referential-id"));
}

#[test]
fn test_emit_subcommand_help() {
    cmd()
        .args(["emit", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--dialect"))
        .stdout(predicate::str::contains("--model"))
        .stdout(predicate::str::contains("--no-seed"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("edfi-dms-ddl"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: warn]"));
}

#[test]
fn test_unknown_verbosity_rejected() {
    cmd()
        .args(["--verbosity", "loud", "core", "-d", "pgsql"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown verbosity"));
}

#[test]
fn test_json_logs_go_to_stderr() {
    cmd()
        .args(["--log-format", "json", "--verbosity", "info", "core", "-d", "pgsql"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("-- ==="))
        .stderr(predicate::str::contains("\"level\":\"INFO\""));
}

// =============================================================================
// Core and Seed Commands
// =============================================================================

#[test]
fn test_core_pgsql_to_stdout() {
    cmd()
        .args(["core", "-d", "pgsql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE SCHEMA IF NOT EXISTS \"dms\";"))
        .stdout(predicate::str::contains("-- Phase 6: Triggers"))
        .stdout(predicate::str::contains("Phase 7").not());
}

#[test]
fn test_core_mssql_to_stdout() {
    cmd()
        .args(["core", "--dialect", "sqlserver"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE [dms].[Document]"))
        .stdout(predicate::str::contains("GO\n"));
}

#[test]
fn test_core_invalid_dialect() {
    cmd()
        .args(["core", "-d", "oracle"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("oracle"));
}

#[test]
fn test_seed_from_yaml_effective_schema() {
    let schema = fixture("school_effective_schema.yaml");
    cmd()
        .args(["seed", "-d", "mssql", "-e"])
        .arg(&schema)
        .assert()
        .success()
        .stdout(predicate::str::contains("-- Phase 7"))
        .stdout(predicate::str::contains("INSERT INTO [dms].[ResourceKey]"))
        .stdout(predicate::str::contains("CREATE TABLE").not());
}

#[test]
fn test_seed_missing_file() {
    cmd()
        .args(["seed", "-d", "pgsql", "-e", "/nonexistent/effective-schema.json"])
        .assert()
        .failure()
        .code(7)
        .stderr(predicate::str::contains("Error:"));
}

// =============================================================================
// Check Command
// =============================================================================

#[test]
fn test_check_reports_model_summary() {
    cmd()
        .args(["check", "-m"])
        .arg(fixture("school_model.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Model OK: dialect=pgsql, resources=2, tables=4, views=1, indexes=2, triggers=5",
        ));
}

#[test]
fn test_check_malformed_model() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(b"{\"dialect\": \"pgsql\"}").unwrap();

    cmd()
        .args(["check", "-m"])
        .arg(file.path())
        .assert()
        .failure()
        .code(1);
}

// =============================================================================
// Emit Command
// =============================================================================

#[test]
fn test_emit_requires_dialect_without_config() {
    cmd()
        .args(["emit", "-m"])
        .arg(fixture("school_model.json"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--dialect is required"));
}

#[test]
fn test_emit_full_script_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("deploy.sql");

    cmd()
        .args(["emit", "-d", "pgsql", "-m"])
        .arg(fixture("school_model.json"))
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let sql = std::fs::read_to_string(&output).unwrap();
    let core = sql.find("-- Phase 1: Schemas").unwrap();
    let relational = sql.find("CREATE TABLE IF NOT EXISTS \"edfi\".\"School\"").unwrap();
    let seed = sql.find("-- Phase 7").unwrap();
    assert!(core < relational && relational < seed);
}

#[test]
fn test_emit_mssql_model() {
    let model = mssql_model();
    cmd()
        .args(["emit", "-d", "mssql", "--no-core", "--no-seed", "-m"])
        .arg(model.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE OR ALTER VIEW [edfi].[EducationOrganization]"))
        .stdout(predicate::str::contains("-- Phase").not());
}

#[test]
fn test_emit_dialect_mismatch() {
    cmd()
        .args(["emit", "-d", "mssql", "-m"])
        .arg(fixture("school_model.json"))
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_emit_all_sections_disabled() {
    cmd()
        .args(["emit", "-d", "pgsql", "--no-core"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_emit_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("seed.sql");
    let config_path = dir.path().join("ddl.yaml");
    std::fs::write(
        &config_path,
        format!(
            "dialect: pgsql\neffective_schema: {}\nsections:\n  core: false\n  relational: false\n  seed: true\n",
            fixture("school_effective_schema.yaml").display()
        ),
    )
    .unwrap();

    cmd()
        .args(["emit", "-c"])
        .arg(&config_path)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let sql = std::fs::read_to_string(&output).unwrap();
    assert!(sql.contains("INSERT INTO \"dms\".\"ResourceKey\""));
    assert!(!sql.contains("CREATE TABLE"));
}

#[test]
fn test_emit_config_not_found() {
    cmd()
        .args(["emit", "-c", "/nonexistent/ddl.yaml"])
        .assert()
        .failure()
        .code(7);
}

// =============================================================================
// Referential Id Command
// =============================================================================

#[test]
fn test_referential_id_prints_v5_uuid() {
    cmd()
        .args([
            "referential-id",
            "--project",
            "Ed-Fi",
            "--resource",
            "School",
            "--identity",
            "$.schoolId=255901",
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_match(
            r"^[0-9a-f]{8}-[0-9a-f]{4}-5[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}\n$",
        )
        .unwrap());
}

#[test]
fn test_referential_id_is_stable() {
    let args = [
        "referential-id",
        "--project",
        "Ed-Fi",
        "--resource",
        "Session",
        "--identity",
        "$.schoolReference.schoolId=255901",
        "--identity",
        "$.sessionName=Fall",
    ];
    let first = cmd().args(args).output().unwrap();
    let second = cmd().args(args).output().unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_referential_id_rejects_malformed_identity() {
    cmd()
        .args([
            "referential-id",
            "--project",
            "Ed-Fi",
            "--resource",
            "School",
            "--identity",
            "schoolId",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("PATH=VALUE"));
}

#[test]
fn test_referential_id_requires_identity() {
    cmd()
        .args(["referential-id", "--project", "Ed-Fi", "--resource", "School"])
        .assert()
        .failure();
}
