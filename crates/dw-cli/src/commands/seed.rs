//! `dw seed`: load seed files into the target database.

use crate::cli::GlobalArgs;
use crate::commands::common::load_project;
use dw_core::SeedKind;
use dw_db::{Database, DuckDbBackend};
use dw_sql::{quote_qualified, DuckDbDialect};

pub async fn execute(global: &GlobalArgs) -> anyhow::Result<i32> {
    let project = load_project(global)?;
    let db = DuckDbBackend::new(&project.database_path(global))?;

    // seeds land in the active target schema, where ref() points
    let target_schema = project.config.schema_for(&global.env);
    db.create_schema_if_not_exists(&quote_qualified(&target_schema, &DuckDbDialect))
        .await?;

    let mut count = 0usize;
    for seed in project.catalog.seeds() {
        let relation = format!("{target_schema}.{}", seed.name.name_part());
        let quoted = quote_qualified(&relation, &DuckDbDialect);
        match seed.kind {
            SeedKind::Csv => {
                db.load_csv(&quoted, &seed.path.display().to_string()).await?;
            }
            SeedKind::Sql => {
                let sql = std::fs::read_to_string(&seed.path)?;
                db.execute_batch(&sql).await?;
            }
        }
        if !global.quiet {
            println!("  ✓ {} -> {relation}", seed.name);
        }
        count += 1;
    }

    println!("Loaded {count} seeds.");
    Ok(0)
}
