//! Slipway CLI entrypoint.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod handlers;

use commands::Commands;

#[derive(Parser)]
#[command(name = "slipway")]
#[command(author, version, about = "Cross-platform release build orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Plan { manifest, context } => handlers::plan(&manifest, &context).await?,
        Commands::Run { manifest, context } => handlers::run(&manifest, &context).await?,
        Commands::Validate { manifest } => handlers::validate(&manifest).await?,
        Commands::Schema => handlers::schema()?,
    }

    Ok(())
}
