//! Command-line interface.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, Settings};

#[derive(Parser)]
#[command(
    name = "chanvet",
    version,
    about = "Validate YouTube channel URLs and enrich them with channel metadata"
)]
pub struct Cli {
    /// Path to a TOML config file (overrides auto-discovery).
    #[arg(long, global = true, env = "CHANNELVET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Rate-limit ceiling in requests per minute, shared by all workers.
    #[arg(long, global = true, env = "CHANNELVET_RATE_LIMIT")]
    pub rate_limit: Option<usize>,

    /// Concurrent fetch tasks.
    #[arg(long, global = true, env = "CHANNELVET_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "CHANNELVET_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Retry ceiling per URL for transient failures.
    #[arg(long, global = true, env = "CHANNELVET_RETRIES")]
    pub retries: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Resolve settings: defaults, then config file, then flags/env.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let config = match &self.config {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load(),
        };

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings);

        if let Some(rate_limit) = self.rate_limit {
            settings.requests_per_minute = rate_limit;
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            settings.request_timeout = timeout;
        }
        if let Some(retries) = self.retries {
            settings.max_retries = retries;
        }

        Ok(settings)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a single channel URL and print the result.
    Validate {
        /// The URL to validate.
        #[arg(long)]
        url: String,

        /// Print the full record as JSON instead of a styled verdict.
        #[arg(long)]
        json: bool,
    },

    /// Validate a batch of URLs from a file or database, resumably.
    Batch {
        #[command(flatten)]
        input: InputArgs,

        /// Output destination: a `.csv` file or a SQLite database path.
        #[arg(long)]
        output: PathBuf,

        /// Results committed per batch transaction.
        #[arg(long, env = "CHANNELVET_BATCH_SIZE")]
        batch_size: Option<usize>,

        /// Reprocess URLs that already have a recorded result.
        #[arg(long)]
        force: bool,
    },

    /// Show recorded result counts for an output destination.
    Status {
        /// The output destination to inspect.
        #[arg(long)]
        output: PathBuf,
    },
}

/// Where batch-mode URLs come from: a CSV file, a SQLite table, or
/// literal `--url` arguments.
#[derive(Args)]
pub struct InputArgs {
    /// Input CSV file or SQLite database containing URLs.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Column holding the URLs (CSV header name or table column).
    #[arg(long, default_value = "url")]
    pub column: String,

    /// Table name; when set, `--input` is treated as a SQLite database.
    #[arg(long)]
    pub table: Option<String>,

    /// Literal URL(s) to validate, repeatable. Alternative to `--input`.
    #[arg(long = "url", value_name = "URL")]
    pub urls: Vec<String>,
}
