use super::*;
use std::fs;
use tempfile::TempDir;

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scan(dir: &TempDir) -> ScanReport {
    let config = Config::default();
    Catalog::build(&dir.path().join("models"), &dir.path().join("seeds"), &config).unwrap()
}

#[test]
fn test_scan_empty_project() {
    let dir = TempDir::new().unwrap();
    let report = scan(&dir);
    assert!(report.catalog.is_empty());
    assert!(report.errors.is_empty());
}

#[test]
fn test_schema_from_directory_segments() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "models/staging/stg_orders.sql", "SELECT 1");
    write_file(dir.path(), "models/top.sql", "SELECT 2");

    let report = scan(&dir);
    assert_eq!(report.catalog.len(), 2);
    assert!(report.catalog.get("staging.stg_orders").is_some());
    // top-level models default to the project schema
    assert!(report.catalog.get("main.top").is_some());
}

#[test]
fn test_frontmatter_overrides() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "models/staging/raw_orders.sql",
        "/*---\nname: orders\nschema: landing\n---*/\nSELECT 1",
    );
    let report = scan(&dir);
    assert!(report.catalog.get("landing.orders").is_some());
}

#[test]
fn test_bad_header_skips_model_and_reports() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "models/good.sql", "SELECT 1");
    write_file(dir.path(), "models/bad.sql", "/*---\nname: [oops\n---*/\nSELECT 1");

    let report = scan(&dir);
    assert_eq!(report.catalog.len(), 1);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(report.errors[0], CoreError::BadHeader { .. }));
}

#[test]
fn test_incremental_without_unique_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "models/events.sql",
        "/*---\nmaterialized: incremental\n---*/\nSELECT 1",
    );
    write_file(
        dir.path(),
        "models/ok.sql",
        "/*---\nmaterialized: incremental\nunique_key: id\n---*/\nSELECT 1",
    );
    let report = scan(&dir);
    assert_eq!(report.catalog.len(), 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].to_string().contains("unique_key"));
}

#[test]
fn test_duplicate_qualified_name_aborts() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "models/staging/orders.sql", "SELECT 1");
    write_file(
        dir.path(),
        "models/other/orders.sql",
        "/*---\nschema: staging\n---*/\nSELECT 2",
    );
    let config = Config::default();
    let err =
        Catalog::build(&dir.path().join("models"), &dir.path().join("seeds"), &config).unwrap_err();
    assert!(matches!(err, CoreError::DuplicateModel { .. }));
}

#[test]
fn test_refs_harvested_at_scan() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "models/marts/revenue.sql",
        r#"SELECT * FROM {{ ref("stg_orders") }}"#,
    );
    let report = scan(&dir);
    let model = report.catalog.get("marts.revenue").unwrap();
    assert!(model.refs.contains("stg_orders"));
}

#[test]
fn test_resolve_graph_orders_dependencies_first() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "models/staging/stg_orders.sql", "SELECT 1");
    write_file(
        dir.path(),
        "models/marts/revenue.sql",
        r#"SELECT * FROM {{ ref("stg_orders") }}"#,
    );
    let report = scan(&dir);
    let graph = report.catalog.resolve_graph().unwrap();
    assert_eq!(
        graph.order,
        vec![
            ModelName::new("staging.stg_orders"),
            ModelName::new("marts.revenue")
        ]
    );
    assert!(graph.deps["marts.revenue"].contains("staging.stg_orders"));
}

#[test]
fn test_unresolved_ref_is_a_build_error_not_scan_error() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "models/m.sql",
        r#"SELECT * FROM {{ ref("missing") }}"#,
    );
    // scan succeeds
    let report = scan(&dir);
    assert_eq!(report.catalog.len(), 1);
    // resolve fails
    let err = report.catalog.resolve_graph().unwrap_err();
    assert!(matches!(err, CoreError::UnresolvedRef { .. }));
}

#[test]
fn test_cycle_aborts_resolve() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "models/a.sql", r#"SELECT * FROM {{ ref("b") }}"#);
    write_file(dir.path(), "models/b.sql", r#"SELECT * FROM {{ ref("a") }}"#);
    let report = scan(&dir);
    let err = report.catalog.resolve_graph().unwrap_err();
    assert!(matches!(err, CoreError::CircularDependency { .. }));
}

#[test]
fn test_seed_discovery_and_ref_to_seed() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "seeds/raw/countries.csv", "code,name\nus,United States\n");
    write_file(
        dir.path(),
        "models/m.sql",
        r#"SELECT * FROM {{ ref("countries") }}"#,
    );
    let report = scan(&dir);
    let seed = report.catalog.get_seed("raw.countries").unwrap();
    assert_eq!(seed.kind, SeedKind::Csv);

    let graph = report.catalog.resolve_graph().unwrap();
    // seed dependencies resolve but do not schedule
    assert!(graph.deps["main.m"].contains("raw.countries"));
    assert_eq!(graph.order, vec![ModelName::new("main.m")]);
}

#[test]
fn test_ambiguous_bare_ref() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "models/staging/orders.sql", "SELECT 1");
    write_file(dir.path(), "models/marts/orders.sql", "SELECT 2");
    write_file(dir.path(), "models/top.sql", r#"SELECT * FROM {{ ref("orders") }}"#);
    let report = scan(&dir);
    let err = report.catalog.resolve_graph().unwrap_err();
    assert!(matches!(err, CoreError::AmbiguousRef { .. }));
}

#[test]
fn test_ref_targets_use_target_schema() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "models/staging/stg_orders.sql", "SELECT 1");
    write_file(
        dir.path(),
        "models/marts/revenue.sql",
        r#"SELECT * FROM {{ ref("stg_orders") }}"#,
    );
    let report = scan(&dir);
    let model = report.catalog.get("marts.revenue").unwrap();

    // the emitted identifier follows the active target schema, not the
    // referenced model's catalog schema
    let dev = report.catalog.ref_targets(model, "analytics").unwrap();
    assert_eq!(dev["stg_orders"], "analytics.stg_orders");

    let prod = report.catalog.ref_targets(model, "analytics_prod").unwrap();
    assert_eq!(prod["stg_orders"], "analytics_prod.stg_orders");
}

#[test]
fn test_ref_targets_still_validate_resolution() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "models/m.sql",
        r#"SELECT * FROM {{ ref("missing") }}"#,
    );
    let report = scan(&dir);
    let model = report.catalog.get("main.m").unwrap();
    let err = report.catalog.ref_targets(model, "analytics").unwrap_err();
    assert!(matches!(err, CoreError::UnresolvedRef { .. }));
}
