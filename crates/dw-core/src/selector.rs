//! Selector parsing and model filtering
//!
//! Supported selector forms:
//! - `schema.model_name` - exact qualified name
//! - `model_name` - bare name (must be unambiguous)
//! - `+model_name` - model and all ancestors
//! - `model_name+` - model and all descendants
//! - `+model_name+` - model, ancestors, and descendants
//! - `tag:daily` - models carrying the tag

use crate::dag::ModelDag;
use crate::error::{CoreError, CoreResult};
use crate::model_name::ModelName;
use crate::project::Catalog;
use std::collections::BTreeSet;

/// Parsed selector type
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorType {
    /// Model name with optional +prefix/suffix for ancestors/descendants
    Model {
        name: String,
        include_ancestors: bool,
        include_descendants: bool,
    },
    /// Tag-based selection
    Tag { tag: String },
}

/// A selector that identifies a subset of models for a build.
#[derive(Debug)]
pub struct Selector {
    selector_type: SelectorType,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(selector: &str) -> CoreResult<Self> {
        let selector = selector.trim();

        if let Some(tag) = selector.strip_prefix("tag:") {
            if tag.is_empty() {
                return Err(CoreError::InvalidSelector {
                    selector: selector.to_string(),
                    reason: "tag: selector requires a tag name".to_string(),
                });
            }
            return Ok(Self {
                selector_type: SelectorType::Tag {
                    tag: tag.to_string(),
                },
            });
        }

        let include_ancestors = selector.starts_with('+');
        let include_descendants = selector.ends_with('+');
        let name = selector
            .trim_start_matches('+')
            .trim_end_matches('+')
            .to_string();

        if name.is_empty() {
            return Err(CoreError::InvalidSelector {
                selector: selector.to_string(),
                reason: "model name cannot be empty".to_string(),
            });
        }

        Ok(Self {
            selector_type: SelectorType::Model {
                name,
                include_ancestors,
                include_descendants,
            },
        })
    }

    /// Compute this selector's initial node set (unordered).
    pub fn apply(&self, catalog: &Catalog, dag: &ModelDag) -> CoreResult<BTreeSet<ModelName>> {
        match &self.selector_type {
            SelectorType::Model {
                name,
                include_ancestors,
                include_descendants,
            } => {
                let resolved = resolve_name(catalog, name)?;
                let mut selected = BTreeSet::new();
                if *include_ancestors {
                    selected.extend(dag.ancestors(&resolved));
                }
                if *include_descendants {
                    selected.extend(dag.descendants(&resolved));
                }
                selected.insert(resolved);
                Ok(selected)
            }
            SelectorType::Tag { tag } => Ok(catalog
                .models()
                .filter(|m| m.has_tag(tag))
                .map(|m| m.name.clone())
                .collect()),
        }
    }
}

/// Resolve a selector name: exact qualified match first, then unambiguous
/// bare-name match.
fn resolve_name(catalog: &Catalog, name: &str) -> CoreResult<ModelName> {
    if catalog.get(name).is_some() {
        return Ok(ModelName::new(name));
    }

    let candidates: Vec<ModelName> = catalog
        .models()
        .filter(|m| m.name.name_part() == name)
        .map(|m| m.name.clone())
        .collect();

    match candidates.as_slice() {
        [single] => Ok(single.clone()),
        [] => Err(CoreError::ModelNotFound {
            name: name.to_string(),
        }),
        many => Err(CoreError::InvalidSelector {
            selector: name.to_string(),
            reason: format!(
                "ambiguous bare name, matches: {}",
                many.iter()
                    .map(|n| n.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

/// Select models for a build: the union of each selector's set, closed
/// upstream/downstream per the flags, returned in topological order.
///
/// An empty selector list selects every model.
pub fn select(
    catalog: &Catalog,
    dag: &ModelDag,
    selectors: &[String],
    upstream: bool,
    downstream: bool,
) -> CoreResult<Vec<ModelName>> {
    let order = dag.topological_order()?;

    if selectors.is_empty() {
        return Ok(order);
    }

    let mut selected: BTreeSet<ModelName> = BTreeSet::new();
    for raw in selectors {
        let selector = Selector::parse(raw)?;
        selected.extend(selector.apply(catalog, dag)?);
    }

    if upstream {
        for name in selected.clone() {
            selected.extend(dag.ancestors(&name));
        }
    }
    if downstream {
        for name in selected.clone() {
            selected.extend(dag.descendants(&name));
        }
    }

    Ok(order.into_iter().filter(|m| selected.contains(m)).collect())
}

#[cfg(test)]
#[path = "selector_test.rs"]
mod tests;
