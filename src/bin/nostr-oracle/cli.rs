//! Command-line interface definition.

use clap::Parser;
use nostr_oracle::config::OracleConfig;
use std::path::PathBuf;

/// Real-time credibility scoring node for Nostr notes.
#[derive(Parser, Debug)]
#[command(name = "nostr-oracle")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root directory for oracle data.
    #[arg(long, env = "ORACLE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// HTTP API port.
    #[arg(long, short, default_value = "4000", env = "ORACLE_PORT")]
    pub port: u16,

    /// Relay addresses, comma-separated.
    #[arg(long, env = "ORACLE_RELAYS", value_delimiter = ',')]
    pub relays: Vec<String>,

    /// API key for the claim-extraction model.
    #[arg(long, env = "OPENAI_API_KEY")]
    pub extraction_api_key: Option<String>,

    /// API key for the news-search collaborator.
    #[arg(long, env = "NEWSAPI_KEY")]
    pub search_api_key: Option<String>,

    /// Lightning address tips are issued from.
    #[arg(long, env = "LIGHTNING_ADDRESS")]
    pub lightning_address: Option<String>,

    /// Base zap amount in sats.
    #[arg(long, env = "ZAP_AMOUNT_SATS")]
    pub zap_amount_sats: Option<u64>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Convert CLI arguments into an `OracleConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn into_config(self) -> color_eyre::Result<OracleConfig> {
        // Start with default config or load from file
        let mut config = if let Some(ref path) = self.config {
            OracleConfig::from_file(path)?
        } else {
            OracleConfig::default()
        };

        // Override with CLI arguments
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }

        config.port = self.port;
        config.log_level = self.log_level;

        if !self.relays.is_empty() {
            config.relays = self.relays;
        }
        if self.extraction_api_key.is_some() {
            config.extraction.api_key = self.extraction_api_key;
        }
        if self.search_api_key.is_some() {
            config.search.api_key = self.search_api_key;
        }
        if let Some(address) = self.lightning_address {
            config.reward.address = address;
        }
        if let Some(amount) = self.zap_amount_sats {
            config.reward.base_amount_sats = amount;
        }

        Ok(config)
    }
}
