//! Error types for nostr-oracle.

use thiserror::Error;

/// Errors produced by oracle components.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Claim extraction collaborator failed.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// News-search collaborator failed.
    #[error("Search error: {0}")]
    Search(String),

    /// Lightning reward processing failed.
    #[error("Reward error: {0}")]
    Reward(String),

    /// HTTP API failure.
    #[error("API error: {0}")]
    Api(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for oracle operations.
pub type Result<T> = std::result::Result<T, Error>;
