pub mod download;
pub mod schema;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tcia_fetch::config::Backoff;

#[derive(Parser)]
#[command(name = "tcia-fetch")]
#[command(
    author,
    version,
    about = "Download image series listed in a TCIA manifest"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download every series in a manifest
    Download(DownloadArgs),

    /// Print JSON Schema for config validation
    Schema,
}

#[derive(Parser, Clone)]
pub struct DownloadArgs {
    /// The manifest file
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// The folder to download the images into
    #[arg(short, long = "output-folder", visible_alias = "output")]
    pub output: PathBuf,

    /// Number of concurrent connections [default: 5]
    #[arg(short = 'j', long)]
    pub njobs: Option<usize>,

    /// Path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Retries per series after the first attempt (overrides the manifest)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Wait before the first retry, in milliseconds
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Backoff between retries: fixed or exponential
    #[arg(long)]
    pub backoff: Option<Backoff>,

    /// Stop retrying a series after a client error or non-ZIP response
    #[arg(long)]
    pub stop_on_permanent: bool,

    /// Override the series download endpoint
    #[arg(long, env = "TCIA_SERVER_URL")]
    pub server_url: Option<String>,

    /// Accept responses without ZIP metadata
    #[arg(long)]
    pub no_verify_zip: bool,

    /// Download again even if the archive already exists
    #[arg(long)]
    pub overwrite: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Show plan without downloading
    #[arg(long)]
    pub dry_run: bool,
}
