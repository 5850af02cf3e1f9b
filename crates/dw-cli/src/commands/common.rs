//! Shared command plumbing: project loading and per-model compilation.

use crate::cli::GlobalArgs;
use anyhow::Context;
use dw_core::model::UniqueKey;
use dw_core::{Catalog, Config, Materialization, Model, ModelName, ResolvedGraph};
use dw_star::{ContextSpec, MacroRegistry, ScriptValue, TargetInfo, ThisInfo};
use dw_template::{parse_string_from_line, Renderer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything the commands need about one loaded project.
pub struct ProjectContext {
    pub root: PathBuf,
    pub config: Config,
    pub catalog: Catalog,
    pub graph: ResolvedGraph,
    pub macros: Arc<MacroRegistry>,
}

impl ProjectContext {
    /// The effective database path: CLI override, then target config.
    pub fn database_path(&self, global: &GlobalArgs) -> String {
        global
            .database
            .clone()
            .unwrap_or_else(|| self.config.target_for(&global.env).path)
    }

    /// The state-store path: CLI override, then `<target_dir>/state.json`.
    pub fn state_path(&self, global: &GlobalArgs) -> PathBuf {
        global
            .state
            .clone()
            .unwrap_or_else(|| self.root.join(&self.config.target_dir).join("state.json"))
    }
}

/// Scan and resolve the project. Catalog and DAG errors abort here, before
/// any model runs.
pub fn load_project(global: &GlobalArgs) -> anyhow::Result<ProjectContext> {
    let root = global.project_dir.clone();
    if !root.exists() {
        anyhow::bail!("project directory not found: {}", root.display());
    }

    let config = Config::load_from_dir(&root).context("loading driftwood.yml")?;

    let report = Catalog::build(
        &config.models_dir_abs(&root),
        &config.seeds_dir_abs(&root),
        &config,
    )
    .context("scanning project")?;

    for err in &report.errors {
        eprintln!("Warning: {err}");
    }

    let graph = report.catalog.resolve_graph().context("resolving references")?;

    let macros = dw_star::load_and_register(&config.macros_dir_abs(&root))
        .context("loading macros")?;

    Ok(ProjectContext {
        root,
        config,
        catalog: report.catalog,
        graph,
        macros: Arc::new(macros),
    })
}

/// One model compiled to executable SQL.
#[derive(Debug, Clone)]
pub struct CompiledModel {
    /// Catalog identity (`schema.name` from directory/frontmatter)
    pub name: ModelName,
    /// Physical identifier in the active environment:
    /// `target_schema.name`, matching what `ref()` emits
    pub relation: String,
    pub sql: String,
    pub materialization: Materialization,
    pub unique_key: Option<Vec<String>>,
    /// Model dependencies (seeds excluded: they are preloaded)
    pub dependencies: BTreeSet<ModelName>,
}

/// Build the execution-context spec for one model.
pub fn context_spec_for(
    project: &ProjectContext,
    model: &Model,
    global: &GlobalArgs,
) -> anyhow::Result<ContextSpec> {
    let target_cfg = project.config.target_for(&global.env);
    let target_schema = project.config.schema_for(&global.env);

    let ref_targets: BTreeMap<String, String> =
        project.catalog.ref_targets(model, &target_schema)?;

    Ok(ContextSpec {
        config: config_dict(model),
        env: global.env.clone(),
        target: Some(TargetInfo {
            db_type: target_cfg.db_type,
            schema: target_schema.clone(),
            database: project.database_path(global),
        }),
        // `this` names the model's own environment-appropriate relation,
        // consistent with what `ref()` hands to dependents.
        this: Some(ThisInfo {
            name: model.name.name_part().to_string(),
            schema: target_schema,
        }),
        ref_targets,
        macros: Arc::clone(&project.macros),
    })
}

/// Render one model body into executable SQL.
pub fn compile_model(
    project: &ProjectContext,
    model: &Model,
    global: &GlobalArgs,
) -> anyhow::Result<CompiledModel> {
    let spec = context_spec_for(project, model, global)?;
    let ctx = spec.build()?;

    let file = model.path.display().to_string();
    let template = parse_string_from_line(&model.raw_body, &file, model.body_line_offset + 1)?;
    let sql = Renderer::new(&ctx).render(&template)?;

    let dependencies = project
        .graph
        .deps
        .get(&model.name)
        .map(|deps| {
            deps.iter()
                .filter(|dep| project.catalog.get(dep).is_some())
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    let target_schema = project.config.schema_for(&global.env);

    Ok(CompiledModel {
        name: model.name.clone(),
        relation: format!("{target_schema}.{}", model.name.name_part()),
        sql: sql.trim().to_string(),
        materialization: model.materialization(project.config.materialization),
        unique_key: model.unique_key(),
        dependencies,
    })
}

/// Frontmatter as the `config` mapping exposed to templates.
fn config_dict(model: &Model) -> ScriptValue {
    let mut pairs: Vec<(ScriptValue, ScriptValue)> = Vec::new();
    let config = &model.config;

    pairs.push(("name".into(), model.name.name_part().into()));
    if let Some(materialized) = config.materialized {
        pairs.push(("materialized".into(), materialized.to_string().into()));
    }
    if let Some(schema) = &config.schema {
        pairs.push(("schema".into(), schema.as_str().into()));
    }
    if let Some(owner) = &config.owner {
        pairs.push(("owner".into(), owner.as_str().into()));
    }
    if let Some(unique_key) = &config.unique_key {
        let value = match unique_key {
            UniqueKey::One(key) => key.as_str().into(),
            UniqueKey::Many(keys) => {
                ScriptValue::List(keys.iter().map(|k| k.as_str().into()).collect())
            }
        };
        pairs.push(("unique_key".into(), value));
    }
    if !config.tags.is_empty() {
        pairs.push((
            "tags".into(),
            ScriptValue::List(config.tags.iter().map(|t| t.as_str().into()).collect()),
        ));
    }
    for (key, value) in &config.extra {
        pairs.push((key.as_str().into(), ScriptValue::from_yaml(value)));
    }

    pairs.sort_by(|(a, _), (b, _)| a.as_str().cmp(&b.as_str()));
    ScriptValue::Dict(pairs)
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
