//! Driftwood CLI - a SQL transformation engine

use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Exit code for configuration or parse errors before any model ran.
const EXIT_CONFIG_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => commands::run::execute(args, &cli.global).await,
        Commands::Compile(args) => commands::compile::execute(args, &cli.global).await,
        Commands::Ls => commands::ls::execute(&cli.global).await,
        Commands::Dag => commands::dag::execute(&cli.global).await,
        Commands::Seed => commands::seed::execute(&cli.global).await,
        Commands::Lineage(args) => commands::lineage::execute(args, &cli.global).await,
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    }
}
