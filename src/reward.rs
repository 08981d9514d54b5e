//! Lightning reward trigger for high-scoring content.
//!
//! Authors of notes scoring above the quality threshold receive a tip
//! proportional to the score. Invoice generation is mocked; the service
//! produces the zap-request record a real Lightning wallet would pay and
//! publish. The caller treats the whole step as best-effort: failures are
//! logged and the surrounding result is never blocked.

use crate::config::RewardConfig;
use crate::error::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// NIP-57 zap request kind.
const ZAP_REQUEST_KIND: u32 = 9734;

/// Mock invoice lifetime in seconds.
const INVOICE_EXPIRY_SECS: i64 = 3600;

/// A generated (mock) Lightning invoice.
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    /// BOLT11 payment request.
    pub bolt11: String,
    /// Payment hash.
    pub payment_hash: String,
    /// Amount in sats.
    pub amount_sats: u64,
    /// Invoice description.
    pub description: String,
    /// Expiry, unix seconds.
    pub expires_at: i64,
}

/// A zap-request record referencing the rewarded event and its author.
#[derive(Debug, Clone, Serialize)]
pub struct ZapRequest {
    /// Record id: digest over the request fields.
    pub id: String,
    /// Event kind.
    pub kind: u32,
    /// Creation time, unix seconds.
    pub created_at: i64,
    /// Recipient (note author) public key.
    pub recipient_pubkey: String,
    /// The rewarded event id.
    pub event_id: String,
    /// Amount in millisats.
    pub amount_msats: u64,
    /// Relay hints for the receipt.
    pub relays: Vec<String>,
    /// Tip comment.
    pub content: String,
}

/// Outcome of a successful zap.
#[derive(Debug, Clone, Serialize)]
pub struct ZapOutcome {
    /// Tip amount in sats.
    pub amount_sats: u64,
    /// The (mock) invoice backing the tip.
    pub invoice: Invoice,
    /// The zap-request record.
    pub zap_request: ZapRequest,
    /// Human-readable outcome message.
    pub message: String,
}

/// Reward-rail configuration exposed on the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct WalletInfo {
    /// Lightning address.
    pub address: String,
    /// Base zap amount in sats.
    pub default_zap_amount: u64,
    /// Supported feature labels.
    pub supported_features: Vec<&'static str>,
    /// Minimum score (exclusive) for a zap.
    pub zap_threshold: u8,
    /// Rail mode.
    pub status: &'static str,
}

/// Issues proportional rewards for high-scoring results.
pub struct RewardService {
    config: RewardConfig,
    relays: Vec<String>,
}

impl RewardService {
    /// Create the service.
    #[must_use]
    pub fn new(config: RewardConfig, relays: Vec<String>) -> Self {
        Self { config, relays }
    }

    /// Process a zap for a scored note. Returns `Ok(None)` when the score
    /// does not clear the (exclusive) threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if invoice generation fails. Callers swallow the
    /// error; a failed zap never affects the surrounding result.
    pub async fn process_zap(
        &self,
        event_id: &str,
        author_pubkey: &str,
        score: u8,
    ) -> Result<Option<ZapOutcome>> {
        if score <= self.config.quality_threshold {
            debug!(
                "Score {score} at or below threshold {}, no zap",
                self.config.quality_threshold
            );
            return Ok(None);
        }

        let amount_sats = u64::from(score) * self.config.base_amount_sats / 100;
        let invoice = self
            .generate_invoice(
                amount_sats,
                format!("nostr-oracle tip for high-quality content (score: {score})"),
            )
            .await?;

        let zap_request = self.build_zap_request(
            author_pubkey,
            event_id,
            amount_sats * 1000,
            format!("Automated tip from nostr-oracle for credible content (score: {score}/100)"),
        );

        info!("Zap processed: {amount_sats} sats for event {event_id}");

        Ok(Some(ZapOutcome {
            amount_sats,
            invoice,
            zap_request,
            message: format!("Zapped {amount_sats} sats for high-quality content"),
        }))
    }

    /// Reward-rail configuration summary.
    #[must_use]
    pub fn wallet_info(&self) -> WalletInfo {
        WalletInfo {
            address: self.config.address.clone(),
            default_zap_amount: self.config.base_amount_sats,
            supported_features: vec![
                "NIP-57 Zaps",
                "Automated tipping",
                "Quality-based rewards",
            ],
            zap_threshold: self.config.quality_threshold,
            status: "mock_mode",
        }
    }

    /// Generate a mock invoice. A production deployment would talk to a
    /// wallet backend here.
    async fn generate_invoice(&self, amount_sats: u64, description: String) -> Result<Invoice> {
        if amount_sats == 0 {
            return Err(Error::Reward("zero-amount invoice".to_string()));
        }

        let now = Utc::now();
        debug!("Mock: generating Lightning invoice for {amount_sats} sats");

        Ok(Invoice {
            bolt11: format!("lnbc{amount_sats}u1p_mock_invoice_{}", now.timestamp_millis()),
            payment_hash: format!("mock_hash_{}", now.timestamp_millis()),
            amount_sats,
            description,
            expires_at: now.timestamp() + INVOICE_EXPIRY_SECS,
        })
    }

    fn build_zap_request(
        &self,
        recipient_pubkey: &str,
        event_id: &str,
        amount_msats: u64,
        content: String,
    ) -> ZapRequest {
        let created_at = Utc::now().timestamp();

        let mut hasher = Sha256::new();
        hasher.update(recipient_pubkey.as_bytes());
        hasher.update(event_id.as_bytes());
        hasher.update(amount_msats.to_be_bytes());
        hasher.update(created_at.to_be_bytes());
        let id = hex::encode(hasher.finalize());

        ZapRequest {
            id,
            kind: ZAP_REQUEST_KIND,
            created_at,
            recipient_pubkey: recipient_pubkey.to_string(),
            event_id: event_id.to_string(),
            amount_msats,
            relays: self.relays.clone(),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> RewardService {
        RewardService::new(
            RewardConfig::default(),
            vec!["wss://relay.damus.io".to_string()],
        )
    }

    #[tokio::test]
    async fn score_85_pays_850() {
        let outcome = service()
            .process_zap("ev1", "author", 85)
            .await
            .expect("zap")
            .expect("above threshold");
        assert_eq!(outcome.amount_sats, 850);
        assert_eq!(outcome.zap_request.amount_msats, 850_000);
    }

    #[tokio::test]
    async fn threshold_is_exclusive() {
        let outcome = service().process_zap("ev1", "author", 80).await.expect("zap");
        assert!(outcome.is_none());

        let outcome = service().process_zap("ev1", "author", 81).await.expect("zap");
        assert_eq!(outcome.expect("zap").amount_sats, 810);
    }

    #[tokio::test]
    async fn perfect_score_pays_base_amount() {
        let outcome = service()
            .process_zap("ev1", "author", 100)
            .await
            .expect("zap")
            .expect("above threshold");
        assert_eq!(outcome.amount_sats, 1000);
    }

    #[tokio::test]
    async fn request_references_event_and_author() {
        let outcome = service()
            .process_zap("ev42", "npub_author", 90)
            .await
            .expect("zap")
            .expect("above threshold");

        let request = &outcome.zap_request;
        assert_eq!(request.kind, 9734);
        assert_eq!(request.event_id, "ev42");
        assert_eq!(request.recipient_pubkey, "npub_author");
        assert_eq!(request.id.len(), 64);
        assert!(!request.relays.is_empty());
    }

    #[test]
    fn wallet_info_reflects_config() {
        let info = service().wallet_info();
        assert_eq!(info.default_zap_amount, 1000);
        assert_eq!(info.zap_threshold, 80);
        assert_eq!(info.status, "mock_mode");
    }
}
