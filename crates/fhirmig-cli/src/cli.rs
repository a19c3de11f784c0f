use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fhirmig")]
#[command(about = "fhirmig — resumable parallel record migrations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a fhirmig.toml config file
    #[arg(short, long, global = true, env = "FHIRMIG_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a migration run
    Run(RunArgs),
    /// Summarize the outcome logs of prior runs for a data type
    Report(ReportArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Registered data type to migrate (e.g. patients)
    pub data_type: String,

    /// Input records file: a JSON array of records, or an object keyed by
    /// group (all rows for one key are processed in the same chunk)
    #[arg(long)]
    pub input: PathBuf,

    /// Number of records (or groups) to process per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Maximum number of concurrent workers
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Update existing records instead of skipping them
    #[arg(long)]
    pub update: bool,

    /// Only show ignore and error messages
    #[arg(long)]
    pub quiet: bool,

    /// Show the per-reason breakdown after the summary
    #[arg(long)]
    pub details: bool,
}

#[derive(clap::Args)]
pub struct ReportArgs {
    /// Data type whose outcome logs to summarize
    pub data_type: String,
}
