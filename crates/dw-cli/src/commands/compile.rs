//! `dw compile`: render selected models without executing them.

use crate::cli::{CompileArgs, GlobalArgs};
use crate::commands::common::{compile_model, load_project};
use dw_core::selector;
use std::fs;

pub async fn execute(args: &CompileArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let project = load_project(global)?;

    let selected = selector::select(
        &project.catalog,
        &project.graph.dag,
        &args.select,
        false,
        false,
    )?;

    let out_dir = project.root.join(&project.config.target_dir).join("compiled");
    fs::create_dir_all(&out_dir)?;

    let mut failures = 0usize;
    for name in &selected {
        let model = project
            .catalog
            .get(name)
            .unwrap_or_else(|| unreachable!("selection comes from the catalog"));
        match compile_model(&project, model, global) {
            Ok(compiled) => {
                let path = out_dir.join(format!("{name}.sql"));
                fs::write(&path, &compiled.sql)?;
                if !global.quiet {
                    println!("-- {name} -> {}", path.display());
                }
            }
            Err(err) => {
                eprintln!("  ✗ {name} - {err:#}");
                failures += 1;
            }
        }
    }

    println!("Compiled {}/{} models.", selected.len() - failures, selected.len());
    Ok(if failures == 0 { 0 } else { 1 })
}
