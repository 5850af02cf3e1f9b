//! `dw lineage`: render one model and print its column-level lineage.

use crate::cli::{GlobalArgs, LineageArgs};
use crate::commands::common::{compile_model, load_project};
use dw_core::selector;
use dw_sql::extract_lineage;

pub async fn execute(args: &LineageArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let project = load_project(global)?;

    let selected = selector::select(
        &project.catalog,
        &project.graph.dag,
        std::slice::from_ref(&args.model),
        false,
        false,
    )?;
    let name = selected
        .first()
        .ok_or_else(|| anyhow::anyhow!("model not found: {}", args.model))?;
    let model = project
        .catalog
        .get(name)
        .unwrap_or_else(|| unreachable!("selection comes from the catalog"));

    let compiled = compile_model(&project, model, global)?;
    let lineage = extract_lineage(&compiled.sql, None)?;

    println!("{}", serde_json::to_string_pretty(&lineage)?);
    Ok(0)
}
