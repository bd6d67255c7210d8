//! callwatch - call detection and caller identification
//!
//! Main binary entry point for the command-line interface.

use anyhow::Context;
use callwatch::cli::{Cli, Commands};
use callwatch::config::Config;
use callwatch::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let verbose = cli.verbose || config.logging.verbose;
    match &config.logging.file {
        Some(path) => logging::init_file_logging(path, verbose)?,
        None => logging::init_logging(verbose)?,
    }

    match cli.command {
        Commands::Normalize(args) => callwatch::cli::normalize::run(args).await,
        Commands::Lookup(args) => callwatch::cli::lookup::run(args).await,
        Commands::Replay(args) => callwatch::cli::replay::run(args, config).await,
    }
}
