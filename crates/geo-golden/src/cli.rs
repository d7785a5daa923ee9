//! Command line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Golden-file regression runner for geospatial processing tools.
#[derive(Debug, Parser)]
#[command(name = "geo-golden", version, about)]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the tests of an environment
    Run(RunArgs),
    /// Capture a new test definition from a reference product
    Snapshot(SnapshotArgs),
    /// Print the JSON schema of test definitions
    Schema,
}

/// Arguments of `run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Environment root directory
    #[arg(short, long)]
    pub env: PathBuf,

    /// Comma-separated test names to run
    #[arg(short, long)]
    pub names: Option<String>,

    /// Comma-separated tags to run
    #[arg(short, long)]
    pub tags: Option<String>,

    /// Processing tool executable, replacing the first word of every command
    #[arg(long)]
    pub tool: Option<PathBuf>,

    /// Deadline per tool invocation in seconds, overriding the configuration
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Arguments of `snapshot`.
#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Reference product
    #[arg(short, long)]
    pub dataset: PathBuf,

    /// Name of the new test
    #[arg(long)]
    pub name: String,

    /// Test description
    #[arg(long)]
    pub description: Option<String>,

    /// Comma-separated tags
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Command template; a reminder placeholder is written when omitted
    #[arg(long = "command")]
    pub command_template: Option<String>,

    /// Seed of the sampling streams
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Pixel samples per raster
    #[arg(long)]
    pub pixel_samples: Option<usize>,

    /// Geolocation samples
    #[arg(long)]
    pub geo_samples: Option<usize>,

    /// Metadata samples
    #[arg(long)]
    pub metadata_samples: Option<usize>,

    /// Skip min, max and histogram
    #[arg(long)]
    pub no_statistics: bool,

    /// Output file or directory; standard output when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
