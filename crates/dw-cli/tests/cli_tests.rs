//! End-to-end tests driving the `dw` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn dw_bin() -> String {
    env!("CARGO_BIN_EXE_dw").to_string()
}

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn run_dw(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(dw_bin())
        .arg("--project-dir")
        .arg(dir.path())
        .args(args)
        .output()
        .expect("failed to spawn dw")
}

fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "driftwood.yml", "name: demo\nschema: analytics\n");
    write_file(
        dir.path(),
        "models/staging/stg_orders.sql",
        "SELECT 1 AS id, 10 AS amount",
    );
    write_file(
        dir.path(),
        "models/marts/totals.sql",
        "/*---\nmaterialized: table\n---*/\nSELECT SUM(amount) AS total FROM {{ ref(\"stg_orders\") }}",
    );
    dir
}

#[test]
fn test_ls_lists_models() {
    let dir = sample_project();
    let output = run_dw(&dir, &["ls"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("staging.stg_orders"));
    assert!(stdout.contains("marts.totals (table)"));
}

#[test]
fn test_dag_prints_execution_order() {
    let dir = sample_project();
    let output = run_dw(&dir, &["dag"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stg = stdout.find("staging.stg_orders").unwrap();
    let mart = stdout.find("marts.totals").unwrap();
    assert!(stg < mart);
    assert!(stdout.contains("marts.totals <- staging.stg_orders"));
}

#[test]
fn test_run_against_file_database() {
    let dir = sample_project();
    let db_path = dir.path().join("warehouse.db");
    let output = run_dw(
        &dir,
        &["run", "--database", db_path.to_str().unwrap(), "--quiet"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "run failed\nstdout: {stdout}\nstderr: {stderr}"
    );
    assert!(stdout.contains("2/2 models succeeded"));
    assert!(db_path.exists());
    // state is committed next to the compiled output
    assert!(dir.path().join("target/state.json").exists());
}

#[test]
fn test_run_dry_run_prints_sql() {
    let dir = sample_project();
    let output = run_dw(&dir, &["run", "--dry-run"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("SELECT SUM(amount) AS total FROM analytics.stg_orders"));
}

#[test]
fn test_run_selector_limits_models() {
    let dir = sample_project();
    let output = run_dw(&dir, &["run", "--dry-run", "--select", "stg_orders"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("staging.stg_orders"));
    assert!(!stdout.contains("marts.totals"));
}

#[test]
fn test_unresolved_ref_exits_with_config_error() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "models/m.sql",
        "SELECT * FROM {{ ref(\"missing\") }}",
    );
    let output = run_dw(&dir, &["run", "--dry-run"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing"));
}

#[test]
fn test_failing_model_exits_one_and_skips_dependents() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "driftwood.yml", "name: demo\n");
    write_file(
        dir.path(),
        "models/bad.sql",
        "SELECT * FROM table_that_does_not_exist",
    );
    write_file(
        dir.path(),
        "models/child.sql",
        "SELECT * FROM {{ ref(\"bad\") }}",
    );
    let output = run_dw(&dir, &["run", "--quiet"]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("skipped"));
}

#[test]
fn test_compile_writes_target_files() {
    let dir = sample_project();
    let output = run_dw(&dir, &["compile"]);
    assert!(output.status.success());
    let compiled = dir.path().join("target/compiled/marts.totals.sql");
    assert!(compiled.exists());
    let sql = fs::read_to_string(compiled).unwrap();
    assert!(sql.contains("analytics.stg_orders"));
}

#[test]
fn test_lineage_command_outputs_json() {
    let dir = sample_project();
    let output = run_dw(&dir, &["lineage", "marts.totals"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["sources"][0], "analytics.stg_orders");
    assert_eq!(parsed["columns"][0]["name"], "total");
    assert_eq!(parsed["columns"][0]["transform"], "expression");
}

#[test]
fn test_seed_loads_csv() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "driftwood.yml", "name: demo\n");
    write_file(dir.path(), "seeds/countries.csv", "code,name\nus,United States\n");
    let db_path = dir.path().join("warehouse.db");
    let output = run_dw(&dir, &["seed", "--database", db_path.to_str().unwrap()]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "seed failed: {stderr}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Loaded 1 seeds"));
}
