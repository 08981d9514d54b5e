//! Configuration for nostr-oracle.

use crate::verify::scorer::ScoringPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Root directory for oracle data (database file lives here).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HTTP API port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Relay addresses the external transport reads from.
    #[serde(default = "default_relays")]
    pub relays: Vec<String>,

    /// Uniform timeout applied to every outbound collaborator call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Intake / rate-limiter configuration.
    #[serde(default)]
    pub intake: IntakeConfig,

    /// Claim extraction configuration.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// News-search configuration.
    #[serde(default)]
    pub search: SearchConfig,

    /// Claim cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Lightning reward configuration.
    #[serde(default)]
    pub reward: RewardConfig,

    /// Credibility scoring policy.
    #[serde(default)]
    pub scoring: ScoringPolicy,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Admission-rate control configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// Minimum spacing between pipeline admissions, in seconds.
    #[serde(default = "default_admission_interval")]
    pub admission_interval_secs: u64,

    /// Granularity of the independent admission poll, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

/// Claim extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// API key for the language-model collaborator. Fallback extraction is
    /// used when absent.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Chat-completions endpoint.
    #[serde(default = "default_extraction_endpoint")]
    pub endpoint: String,

    /// Model identifier.
    #[serde(default = "default_extraction_model")]
    pub model: String,
}

/// News-search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// API key for the search collaborator. Claims score the failure
    /// fallback when absent.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Search endpoint.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Maximum articles requested per claim.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Claim cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Durable entries unused for this many days are purged by the
    /// maintenance sweep.
    #[serde(default = "default_cache_max_age")]
    pub max_age_days: u32,

    /// Capacity of the in-memory mirror.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

/// Lightning reward configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    /// Lightning address tips are issued from.
    #[serde(default = "default_lightning_address")]
    pub address: String,

    /// Base zap amount in sats; actual tips scale with the score.
    #[serde(default = "default_zap_amount")]
    pub base_amount_sats: u64,

    /// Scores strictly above this threshold trigger a zap.
    #[serde(default = "default_zap_threshold")]
    pub quality_threshold: u8,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            port: default_port(),
            relays: default_relays(),
            request_timeout_secs: default_request_timeout(),
            intake: IntakeConfig::default(),
            extraction: ExtractionConfig::default(),
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            reward: RewardConfig::default(),
            scoring: ScoringPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            admission_interval_secs: default_admission_interval(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_extraction_endpoint(),
            model: default_extraction_model(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_search_endpoint(),
            page_size: default_page_size(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_cache_max_age(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            address: default_lightning_address(),
            base_amount_sats: default_zap_amount(),
            quality_threshold: default_zap_threshold(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "nostr-oracle")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".nostr-oracle"))
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_port() -> u16 {
    4000
}

fn default_relays() -> Vec<String> {
    vec![
        "wss://relay.damus.io".to_string(),
        "wss://nos.lol".to_string(),
    ]
}

const fn default_request_timeout() -> u64 {
    8
}

const fn default_admission_interval() -> u64 {
    30
}

const fn default_poll_interval() -> u64 {
    10
}

fn default_extraction_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_extraction_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_search_endpoint() -> String {
    "https://newsapi.org/v2/everything".to_string()
}

const fn default_page_size() -> u32 {
    5
}

const fn default_cache_max_age() -> u32 {
    30
}

const fn default_memory_capacity() -> usize {
    10_000
}

fn default_lightning_address() -> String {
    "nostroracle@getalby.com".to_string()
}

const fn default_zap_amount() -> u64 {
    1000
}

const fn default_zap_threshold() -> u8 {
    80
}

impl OracleConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_canonical() {
        let config = OracleConfig::default();
        assert_eq!(config.port, 4000);
        assert_eq!(config.intake.admission_interval_secs, 30);
        assert_eq!(config.intake.poll_interval_secs, 10);
        assert_eq!(config.cache.max_age_days, 30);
        assert_eq!(config.reward.quality_threshold, 80);
        assert_eq!(config.reward.base_amount_sats, 1000);
        assert_eq!(config.request_timeout_secs, 8);
    }

    #[test]
    fn toml_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let mut config = OracleConfig::default();
        config.port = 4101;
        config.search.api_key = Some("k".to_string());
        config.to_file(&path).expect("save");

        let loaded = OracleConfig::from_file(&path).expect("load");
        assert_eq!(loaded.port, 4101);
        assert_eq!(loaded.search.api_key.as_deref(), Some("k"));
        assert_eq!(loaded.intake.admission_interval_secs, 30);
    }
}
