//! `dw ls`: list catalog entries.

use crate::cli::GlobalArgs;
use crate::commands::common::load_project;

pub async fn execute(global: &GlobalArgs) -> anyhow::Result<i32> {
    let project = load_project(global)?;

    println!("Models ({}):", project.catalog.len());
    for model in project.catalog.models() {
        let materialization = model.materialization(project.config.materialization);
        let tags = if model.config.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", model.config.tags.join(", "))
        };
        println!("  {} ({materialization}){tags}", model.name);
    }

    let seeds: Vec<_> = project.catalog.seeds().collect();
    if !seeds.is_empty() {
        println!("Seeds ({}):", seeds.len());
        for seed in seeds {
            println!("  {}", seed.name);
        }
    }

    Ok(0)
}
