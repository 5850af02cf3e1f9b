//! Project scan and model catalog.
//!
//! The scan is the cheap first pass of the two-pass design: it reads file
//! headers and harvests textual `ref()` edges without rendering any template.

use crate::config::Config;
use crate::dag::ModelDag;
use crate::error::{CoreError, CoreResult};
use crate::header::scan_header;
use crate::model::Model;
use crate::model_name::ModelName;
use crate::refs::harvest_refs;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Kind of a seed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    /// CSV data loaded into a table
    Csv,
    /// SQL executed verbatim
    Sql,
}

/// A seed: static data loaded ahead of any model run.
#[derive(Debug, Clone)]
pub struct Seed {
    /// Qualified name (`schema.name`)
    pub name: ModelName,
    /// Path to the seed file
    pub path: PathBuf,
    /// CSV or SQL
    pub kind: SeedKind,
}

/// The immutable model catalog produced by a project scan.
#[derive(Debug, Default)]
pub struct Catalog {
    models: BTreeMap<ModelName, Model>,
    seeds: BTreeMap<ModelName, Seed>,
}

/// Result of a project scan: the catalog plus per-file errors that did not
/// abort the scan (bad headers skip their model and are reported).
#[derive(Debug)]
pub struct ScanReport {
    pub catalog: Catalog,
    pub errors: Vec<CoreError>,
}

/// A resolved reference graph over the catalog.
#[derive(Debug)]
pub struct ResolvedGraph {
    pub dag: ModelDag,
    /// Models in deterministic topological order.
    pub order: Vec<ModelName>,
    /// Per-model resolved dependencies (models and seeds).
    pub deps: BTreeMap<ModelName, BTreeSet<ModelName>>,
}

impl Catalog {
    /// Scan a models tree and a seeds tree and build the catalog.
    ///
    /// Duplicate qualified names abort the build; malformed headers skip the
    /// model and are reported in the returned error list.
    pub fn build(models_dir: &Path, seeds_dir: &Path, config: &Config) -> CoreResult<ScanReport> {
        let mut catalog = Catalog::default();
        let mut errors = Vec::new();

        if models_dir.exists() {
            let mut sql_files = Vec::new();
            collect_files(models_dir, &["sql"], &mut sql_files)?;
            sql_files.sort();
            for path in sql_files {
                match load_model(&path, models_dir, config) {
                    Ok(model) => catalog.insert_model(model)?,
                    Err(err @ CoreError::BadHeader { .. }) => {
                        log::warn!("skipping model: {err}");
                        errors.push(err);
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        if seeds_dir.exists() {
            let mut seed_files = Vec::new();
            collect_files(seeds_dir, &["csv", "sql"], &mut seed_files)?;
            seed_files.sort();
            for path in seed_files {
                let seed = load_seed(&path, seeds_dir, config)?;
                catalog.insert_seed(seed)?;
            }
        }

        Ok(ScanReport { catalog, errors })
    }

    fn insert_model(&mut self, model: Model) -> CoreResult<()> {
        if let Some(existing) = self.models.get(&model.name) {
            return Err(CoreError::DuplicateModel {
                name: model.name.to_string(),
                first: existing.path.display().to_string(),
                second: model.path.display().to_string(),
            });
        }
        if let Some(existing) = self.seeds.get(&model.name) {
            return Err(CoreError::DuplicateModel {
                name: model.name.to_string(),
                first: existing.path.display().to_string(),
                second: model.path.display().to_string(),
            });
        }
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    fn insert_seed(&mut self, seed: Seed) -> CoreResult<()> {
        if let Some(existing) = self.models.get(&seed.name) {
            return Err(CoreError::DuplicateModel {
                name: seed.name.to_string(),
                first: existing.path.display().to_string(),
                second: seed.path.display().to_string(),
            });
        }
        if let Some(existing) = self.seeds.get(&seed.name) {
            return Err(CoreError::DuplicateModel {
                name: seed.name.to_string(),
                first: existing.path.display().to_string(),
                second: seed.path.display().to_string(),
            });
        }
        self.seeds.insert(seed.name.clone(), seed);
        Ok(())
    }

    /// Number of models in the catalog.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the catalog holds no models.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Look up a model by qualified name.
    pub fn get(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Look up a seed by qualified name.
    pub fn get_seed(&self, name: &str) -> Option<&Seed> {
        self.seeds.get(name)
    }

    /// Iterate models in name order.
    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    /// Iterate seeds in name order.
    pub fn seeds(&self) -> impl Iterator<Item = &Seed> {
        self.seeds.values()
    }

    /// Resolve one textual reference from `model` against the catalog.
    ///
    /// A reference is either an exact qualified name or a bare name that must
    /// match exactly one model or seed.
    pub fn resolve_ref(&self, model: &ModelName, reference: &str) -> CoreResult<ModelName> {
        if self.models.contains_key(reference) || self.seeds.contains_key(reference) {
            return Ok(ModelName::new(reference));
        }

        let candidates: Vec<&ModelName> = self
            .models
            .keys()
            .chain(self.seeds.keys())
            .filter(|n| n.name_part() == reference)
            .collect();

        match candidates.as_slice() {
            [single] => Ok((*single).clone()),
            [] => Err(CoreError::UnresolvedRef {
                model: model.to_string(),
                reference: reference.to_string(),
            }),
            many => Err(CoreError::AmbiguousRef {
                model: model.to_string(),
                reference: reference.to_string(),
                candidates: many
                    .iter()
                    .map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Resolve every model's references and return the ordered graph.
    ///
    /// Unresolved references and cycles are hard errors here (the build
    /// pass), not at scan time. Seed dependencies resolve but contribute no
    /// scheduling edges: seeds are loaded ahead of any model run.
    pub fn resolve_graph(&self) -> CoreResult<ResolvedGraph> {
        let mut dag = ModelDag::new();
        let mut deps: BTreeMap<ModelName, BTreeSet<ModelName>> = BTreeMap::new();

        for model in self.models.values() {
            dag.add_node(&model.name);
            let entry = deps.entry(model.name.clone()).or_default();
            for reference in &model.refs {
                let resolved = self.resolve_ref(&model.name, reference)?;
                if self.models.contains_key(&resolved) {
                    dag.add_edge(&resolved, &model.name);
                }
                entry.insert(resolved);
            }
        }

        let order = dag.topological_order()?;
        Ok(ResolvedGraph { dag, order, deps })
    }

    /// Map each harvested reference of `model` to its environment-appropriate
    /// physical identifier: `target_schema.name`.
    ///
    /// Resolution still goes through the catalog (unknown or ambiguous
    /// references are errors here); the catalog's qualified name is the
    /// model's identity, while the emitted identifier is qualified with the
    /// active target schema.
    pub fn ref_targets(
        &self,
        model: &Model,
        target_schema: &str,
    ) -> CoreResult<BTreeMap<String, String>> {
        let mut targets = BTreeMap::new();
        for reference in &model.refs {
            let resolved = self.resolve_ref(&model.name, reference)?;
            targets.insert(
                reference.clone(),
                format!("{target_schema}.{}", resolved.name_part()),
            );
        }
        Ok(targets)
    }
}

/// Load one model file: header scan, name/schema derivation, ref harvest.
fn load_model(path: &Path, models_dir: &Path, config: &Config) -> CoreResult<Model> {
    let source = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })?;

    let file = path.display().to_string();
    let scan = scan_header(&file, &source)?;

    if scan.config.materialized == Some(crate::model::Materialization::Incremental)
        && scan.config.unique_key.is_none()
    {
        return Err(CoreError::BadHeader {
            file,
            line: 1,
            message: "incremental models require a unique_key".to_string(),
        });
    }

    let stem = file_stem(path)?;
    let name = scan.config.name.clone().unwrap_or(stem);
    let schema = scan
        .config
        .schema
        .clone()
        .or_else(|| dir_schema(path, models_dir))
        .unwrap_or_else(|| config.schema.clone());

    let refs = harvest_refs(&scan.body);

    Ok(Model {
        name: ModelName::qualified(&schema, &name),
        path: path.to_path_buf(),
        config: scan.config,
        raw_body: scan.body,
        body_line_offset: scan.body_line_offset,
        refs,
    })
}

fn load_seed(path: &Path, seeds_dir: &Path, config: &Config) -> CoreResult<Seed> {
    let stem = file_stem(path)?;
    let schema = dir_schema(path, seeds_dir).unwrap_or_else(|| config.schema.clone());
    let kind = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => SeedKind::Csv,
        _ => SeedKind::Sql,
    };
    Ok(Seed {
        name: ModelName::qualified(&schema, &stem),
        path: path.to_path_buf(),
        kind,
    })
}

/// Directory segments between the scan root and the file form the schema.
fn dir_schema(path: &Path, root: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parent = rel.parent()?;
    let segments: Vec<&str> = parent
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("."))
    }
}

fn file_stem(path: &Path) -> CoreResult<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "non-UTF-8 file name"),
        })
}

/// Recursively collect files with one of the given extensions.
fn collect_files(dir: &Path, extensions: &[&str], out: &mut Vec<PathBuf>) -> CoreResult<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| CoreError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    })? {
        let entry = entry.map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        if entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.starts_with('.'))
        {
            continue;
        }
        if path.is_dir() {
            collect_files(&path, extensions, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e))
        {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
