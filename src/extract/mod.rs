//! Claim extraction with an AI-first strategy chain.
//!
//! The primary strategy delegates to a language-model collaborator; any
//! failure there (missing credential, transport error, malformed output)
//! falls through to the deterministic pattern extractor. The chosen strategy
//! is recorded in the extraction metadata so downstream consumers can tell
//! how a result was produced.

mod ai;
pub mod patterns;

pub use ai::AiExtractor;

use crate::config::ExtractionConfig;
use serde::{Deserialize, Serialize};
use std::sync::Once;
use std::time::{Duration, Instant};
use tracing::warn;

static CREDENTIAL_WARNING: Once = Once::new();

/// Which strategy produced a set of claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Language-model extraction.
    Ai,
    /// Deterministic sentence-pattern fallback.
    Regex,
}

impl ExtractionMethod {
    /// Stable string form used in persistence and API payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Regex => "regex",
        }
    }
}

/// Metadata describing one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    /// Strategy that produced the claims.
    pub method: ExtractionMethod,
    /// Wall-clock time spent extracting, in milliseconds.
    pub processing_time: u64,
    /// Number of claims returned.
    pub claim_count: usize,
    /// Length of the analyzed text.
    pub text_length: usize,
}

/// Claims plus metadata for one input text.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Ordered candidate claims.
    pub claims: Vec<String>,
    /// Run metadata.
    pub metadata: ExtractionMetadata,
}

/// Extracts factual claims from note content.
pub struct ClaimExtractor {
    ai: Option<AiExtractor>,
}

impl ClaimExtractor {
    /// Build the extractor from configuration. A missing model credential is
    /// not an error; the pattern fallback carries the load alone.
    #[must_use]
    pub fn new(config: &ExtractionConfig, timeout: Duration) -> Self {
        let ai = AiExtractor::from_config(config, timeout);
        if ai.is_none() {
            CREDENTIAL_WARNING.call_once(|| {
                warn!("No extraction API key configured, using pattern extraction only");
            });
        }
        Self { ai }
    }

    /// Extract claims from `text`, trying the model first and falling back to
    /// pattern extraction on any failure.
    pub async fn extract(&self, text: &str) -> Extraction {
        let started = Instant::now();

        let (claims, method) = match &self.ai {
            Some(ai) => match ai.extract(text).await {
                Ok(claims) => (claims, ExtractionMethod::Ai),
                Err(e) => {
                    warn!("Model extraction failed, falling back to patterns: {e}");
                    (patterns::extract_claims(text), ExtractionMethod::Regex)
                }
            },
            None => (patterns::extract_claims(text), ExtractionMethod::Regex),
        };

        let metadata = ExtractionMetadata {
            method,
            processing_time: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            claim_count: claims.len(),
            text_length: text.len(),
        };

        Extraction { claims, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_without_credential() {
        let extractor = ClaimExtractor::new(&ExtractionConfig::default(), Duration::from_secs(8));
        let extraction = extractor
            .extract("The reactor was shut down on Tuesday. Nice weather!")
            .await;

        assert_eq!(extraction.metadata.method, ExtractionMethod::Regex);
        assert_eq!(extraction.claims.len(), 1);
        assert_eq!(extraction.metadata.claim_count, 1);
        assert_eq!(
            extraction.metadata.text_length,
            "The reactor was shut down on Tuesday. Nice weather!".len()
        );
    }

    #[tokio::test]
    async fn metadata_counts_match_claims() {
        let extractor = ClaimExtractor::new(&ExtractionConfig::default(), Duration::from_secs(8));
        let extraction = extractor.extract("").await;
        assert!(extraction.claims.is_empty());
        assert_eq!(extraction.metadata.claim_count, 0);
    }
}
