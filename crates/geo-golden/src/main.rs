//! # geo-golden
//!
//! Golden-file regression runner for geospatial processing tools.
//!
//! ## Overview
//!
//! Subcommands:
//! - `run`: execute the tests of an environment and write the run report
//! - `snapshot`: capture a new test definition from a reference product
//! - `schema`: print the JSON schema of test definitions
//!
//! ## Architecture
//!
//! This is Layer 3 - the binary that ties together:
//! - geo-golden-core: Core types
//! - geo-golden-engine: Command construction, tool invocation, comparison
//! - geo-golden-runner: Environment, selection, retention, reporting

use clap::Parser;
use geo_golden::{commands, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .init();

    tracing::debug!("geo-golden v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Run(args) => commands::run(args).await,
        Command::Snapshot(args) => commands::snapshot(args),
        Command::Schema => commands::schema(),
    }
}
