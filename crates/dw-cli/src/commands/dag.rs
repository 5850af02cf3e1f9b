//! `dw dag`: print the dependency graph in execution order.

use crate::cli::GlobalArgs;
use crate::commands::common::load_project;

pub async fn execute(global: &GlobalArgs) -> anyhow::Result<i32> {
    let project = load_project(global)?;

    for name in &project.graph.order {
        let deps = project.graph.dag.dependencies(name);
        if deps.is_empty() {
            println!("{name}");
        } else {
            let list: Vec<&str> = deps.iter().map(|d| d.as_str()).collect();
            println!("{name} <- {}", list.join(", "));
        }
    }

    Ok(0)
}
