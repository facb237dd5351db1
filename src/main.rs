//! chanvet binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use channelvet::cli::commands::{cmd_batch, cmd_status, cmd_validate};
use channelvet::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("channelvet=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = cli.settings()?;

    match &cli.command {
        Commands::Validate { url, json } => cmd_validate(&settings, url, *json).await,
        Commands::Batch {
            input,
            output,
            batch_size,
            force,
        } => cmd_batch(&settings, input, output, *batch_size, *force).await,
        Commands::Status { output } => cmd_status(output).await,
    }
}
