//! dw-core - Core library for Driftwood
//!
//! This crate provides shared types, configuration parsing, the project
//! scan (header scanner + reference harvester), the model catalog, DAG
//! building, selectors, and the run-state store used across all Driftwood
//! components.

pub mod config;
pub mod dag;
pub mod error;
pub mod header;
pub mod model;
pub mod model_name;
pub mod project;
pub mod refs;
pub mod selector;
pub mod state;

pub use config::Config;
pub use dag::ModelDag;
pub use error::{CoreError, CoreResult};
pub use model::{Materialization, Model, ModelConfig};
pub use model_name::ModelName;
pub use project::{Catalog, ResolvedGraph, ScanReport, Seed, SeedKind};
pub use state::{RunMeta, RunOutcome, StateStore};
