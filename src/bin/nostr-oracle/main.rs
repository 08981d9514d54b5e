//! nostr-oracle CLI entry point.

mod cli;

use clap::Parser;
use cli::Cli;
use nostr_oracle::OracleBuilder;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("nostr-oracle v{}", env!("CARGO_PKG_VERSION"));

    // Build configuration
    let config = cli.into_config()?;

    // Build and run the oracle
    let mut oracle = OracleBuilder::new(config).build().await?;

    // Run until shutdown
    oracle.run().await?;

    info!("Goodbye!");
    Ok(())
}
