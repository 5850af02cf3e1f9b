//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Driftwood: compile and run annotated SQL models against an analytical
/// database.
#[derive(Parser, Debug)]
#[command(name = "dw", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project directory (holds driftwood.yml, models/, seeds/, macros/)
    #[arg(long, default_value = ".", global = true)]
    pub project_dir: PathBuf,

    /// Active environment (dev, prod, test, ...)
    #[arg(long, default_value = "dev", global = true)]
    pub env: String,

    /// Database path override (file path or :memory:)
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// State file path (default: <target_dir>/state.json)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Suppress progress output
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build selected models against the target database
    Run(RunArgs),
    /// Render selected models without executing them
    Compile(CompileArgs),
    /// List models and seeds in the catalog
    Ls,
    /// Print the dependency graph in execution order
    Dag,
    /// Load seed files into the target database
    Seed,
    /// Render one model and print its column-level lineage
    Lineage(LineageArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Model selectors (name, schema.name, tag:t, +name, name+)
    #[arg(short, long)]
    pub select: Vec<String>,

    /// Include upstream closure of the selection
    #[arg(long)]
    pub upstream: bool,

    /// Include downstream closure of the selection
    #[arg(long)]
    pub downstream: bool,

    /// Worker-pool size (default from driftwood.yml)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Compile and print, submit nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Drop and rebuild incremental models
    #[arg(long)]
    pub full_refresh: bool,

    /// Per-model execution timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Model selectors
    #[arg(short, long)]
    pub select: Vec<String>,
}

#[derive(Args, Debug)]
pub struct LineageArgs {
    /// Model to analyze (qualified or unambiguous bare name)
    pub model: String,
}
