//! Oracle lifecycle: service context, builder and run loop.
//!
//! All shared state lives in one [`Oracle`] context constructed by
//! [`OracleBuilder`] and passed by `Arc` to every task, so tests can build an
//! isolated oracle without process-wide leakage. [`RunningOracle::run`]
//! spawns the periodic admission poll, the serialized pipeline worker, the
//! cache maintenance sweep and the HTTP surface, then waits for shutdown.

use crate::api;
use crate::cache::ClaimCache;
use crate::config::OracleConfig;
use crate::error::Result;
use crate::event::NoteEvent;
use crate::fanout::{FanoutHub, Topic};
use crate::intake::AdmissionGate;
use crate::reward::RewardService;
use crate::storage::{Store, SystemStats};
use crate::verify::{VerificationResult, Verifier, ZapSummary};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Bound on the in-memory recent-results view.
const RECENT_RESULTS_CAP: usize = 20;

/// Spacing of the out-of-band cache maintenance sweep.
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 3600);

/// Shared service context for one oracle instance.
pub struct Oracle {
    config: OracleConfig,
    store: Arc<Store>,
    verifier: Verifier,
    fanout: Arc<FanoutHub>,
    reward: RewardService,
    gate: Arc<AdmissionGate>,
    cache: Arc<ClaimCache>,
    recent: Mutex<VecDeque<VerificationResult>>,
    started_at: Instant,
}

impl Oracle {
    /// The fan-out hub, for transports that deliver live messages.
    #[must_use]
    pub fn fanout(&self) -> &Arc<FanoutHub> {
        &self.fanout
    }

    /// The admission gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    /// Handle one arriving note: persist it, fan it out on the raw feed and
    /// register it with the admission gate. Returns an admitted note when
    /// the gate opens inline.
    pub fn handle_note(&self, note: NoteEvent) -> Option<NoteEvent> {
        if let Err(e) = self.store.save_note(&note) {
            debug!("Failed to persist note {}: {e}", note.id);
        }
        self.fanout.publish_note(&note);
        self.gate.offer(note)
    }

    /// Run the full pipeline for one post: verify, persist idempotently,
    /// update the recent view, trigger the reward and broadcast.
    pub async fn process_content(
        &self,
        content: &str,
        event_id: Option<String>,
    ) -> VerificationResult {
        let result = self.verifier.verify(content, event_id).await;

        // Persistence failures degrade to the in-memory view; the result is
        // still served and broadcast.
        let mut result = match self.store.save_result(&result) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Failed to persist result, keeping in-memory copy: {e}");
                result
            }
        };

        if let Some(zap) = self.try_zap(&result).await {
            result.metadata.zap = Some(zap);
        }

        self.push_recent(result.clone());

        if let Ok(value) = serde_json::to_value(&result) {
            self.fanout.publish(Topic::VerificationResults, value);
        }
        if let Ok(stats) = self.store.stats() {
            if let Ok(value) = serde_json::to_value(stats) {
                self.fanout.publish(Topic::SystemStats, value);
            }
        }

        result
    }

    /// Fire the reward side effect for a live, high-scoring result. Never
    /// propagates failure; a missing author or any reward error simply
    /// leaves the metadata untouched.
    async fn try_zap(&self, result: &VerificationResult) -> Option<ZapSummary> {
        let event_id = result
            .event_id
            .as_deref()
            .filter(|id| !id.starts_with("manual_"))?;

        let author = match self.store.note_author(event_id) {
            Ok(Some(author)) => author,
            Ok(None) => {
                debug!("No stored author for {event_id}, skipping zap");
                return None;
            }
            Err(e) => {
                debug!("Author lookup failed for {event_id}: {e}");
                return None;
            }
        };

        match self
            .reward
            .process_zap(event_id, &author, result.score)
            .await
        {
            Ok(Some(outcome)) => {
                if let Ok(value) = serde_json::to_value(&outcome) {
                    self.fanout.publish(Topic::LightningZaps, value);
                }
                Some(ZapSummary {
                    amount_sats: outcome.amount_sats,
                    message: outcome.message,
                })
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Zap failed for {event_id}: {e}");
                None
            }
        }
    }

    /// Manually trigger a zap, as exposed on the HTTP surface.
    ///
    /// # Errors
    ///
    /// Returns an error if invoice generation fails.
    pub async fn manual_zap(
        &self,
        event_id: &str,
        author_pubkey: &str,
        score: u8,
    ) -> Result<serde_json::Value> {
        match self.reward.process_zap(event_id, author_pubkey, score).await? {
            Some(outcome) => {
                if let Ok(value) = serde_json::to_value(&outcome) {
                    self.fanout.publish(Topic::LightningZaps, value);
                }
                Ok(json!({
                    "success": true,
                    "amount_sats": outcome.amount_sats,
                    "invoice": outcome.invoice.bolt11,
                    "zap_request": outcome.zap_request,
                    "message": outcome.message,
                }))
            }
            None => Ok(json!({
                "success": false,
                "reason": "Content score too low for zap",
                "score": score,
                "threshold": self.reward.wallet_info().zap_threshold,
            })),
        }
    }

    /// Reward-rail configuration for the HTTP surface.
    #[must_use]
    pub fn wallet_info(&self) -> crate::reward::WalletInfo {
        self.reward.wallet_info()
    }

    /// Most recent results, newest first, capped at 20. Durable read with
    /// the in-memory view as fallback.
    #[must_use]
    pub fn recent_scores(&self) -> Vec<VerificationResult> {
        match self.store.recent_results(RECENT_RESULTS_CAP) {
            Ok(results) => results,
            Err(e) => {
                debug!("Durable recent-results read failed, serving memory: {e}");
                self.recent.lock().iter().cloned().collect()
            }
        }
    }

    /// Current statistics; zeros when the store is unavailable.
    #[must_use]
    pub fn stats(&self) -> SystemStats {
        self.store.stats().unwrap_or_default()
    }

    /// Status document for `GET /`.
    #[must_use]
    pub fn status(&self) -> serde_json::Value {
        json!({
            "status": "online",
            "uptime": self.started_at.elapsed().as_secs(),
            "stats": self.stats(),
            "liveFeed": self.fanout.status(),
            "relays": {
                "urls": self.config.relays,
                "configured": self.config.relays.len(),
            },
        })
    }

    /// Purge stale durable cache entries. Runs from the maintenance task.
    pub fn sweep_cache(&self) {
        let removed = self.cache.purge_stale(self.config.cache.max_age_days);
        if removed > 0 {
            info!("Cleaned up {removed} stale claim-cache entries");
        }
    }

    fn push_recent(&self, result: VerificationResult) {
        let mut recent = self.recent.lock();
        recent.push_front(result);
        recent.truncate(RECENT_RESULTS_CAP);
    }
}

/// Builder for constructing an oracle.
pub struct OracleBuilder {
    config: OracleConfig,
}

impl OracleBuilder {
    /// Create a new builder with the given configuration.
    #[must_use]
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    /// Build and wire the oracle.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory or database cannot be
    /// initialized.
    pub async fn build(self) -> Result<RunningOracle> {
        info!("Building nostr-oracle with config: {:?}", self.config);

        std::fs::create_dir_all(&self.config.data_dir)?;
        let store = Arc::new(Store::open(&self.config.data_dir.join("oracle.db"))?);

        let cache = Arc::new(ClaimCache::new(
            Arc::clone(&store),
            self.config.cache.memory_capacity,
        ));
        let verifier = Verifier::new(&self.config, Arc::clone(&cache))?;
        let fanout = Arc::new(FanoutHub::new());
        let reward = RewardService::new(self.config.reward.clone(), self.config.relays.clone());
        let gate = Arc::new(AdmissionGate::new(Duration::from_secs(
            self.config.intake.admission_interval_secs,
        )));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (notes_tx, notes_rx) = mpsc::channel(256);

        let oracle = Arc::new(Oracle {
            config: self.config,
            store,
            verifier,
            fanout,
            reward,
            gate,
            cache,
            recent: Mutex::new(VecDeque::new()),
            started_at: Instant::now(),
        });

        Ok(RunningOracle {
            oracle,
            notes_tx,
            notes_rx: Some(notes_rx),
            shutdown_tx,
            shutdown_rx,
        })
    }
}

/// A running oracle instance.
pub struct RunningOracle {
    oracle: Arc<Oracle>,
    notes_tx: mpsc::Sender<NoteEvent>,
    notes_rx: Option<mpsc::Receiver<NoteEvent>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl RunningOracle {
    /// Handle the external relay transport feeds notes into.
    #[must_use]
    pub fn note_sender(&self) -> mpsc::Sender<NoteEvent> {
        self.notes_tx.clone()
    }

    /// The shared service context.
    #[must_use]
    pub fn context(&self) -> Arc<Oracle> {
        Arc::clone(&self.oracle)
    }

    /// Run the oracle until shutdown is requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP surface cannot be started or the note
    /// channel was already consumed.
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting nostr-oracle");

        let mut notes_rx = self
            .notes_rx
            .take()
            .ok_or_else(|| crate::Error::Config("oracle already running".to_string()))?;

        // Serialized pipeline worker: one run at a time, admission order
        // equals processing order.
        let (admitted_tx, mut admitted_rx) = mpsc::channel::<NoteEvent>(8);
        let worker_oracle = Arc::clone(&self.oracle);
        tokio::spawn(async move {
            while let Some(note) = admitted_rx.recv().await {
                let result = worker_oracle
                    .process_content(&note.content, Some(note.id.clone()))
                    .await;
                debug!("Processed {} with score {}", note.id, result.score);
            }
        });

        // Independent admission poll, covering quiet arrival periods.
        let poll_oracle = Arc::clone(&self.oracle);
        let poll_tx = admitted_tx.clone();
        let mut poll_shutdown = self.shutdown_rx.clone();
        let poll_interval = Duration::from_secs(self.oracle.config.intake.poll_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = poll_shutdown.changed() => {
                        if *poll_shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if let Some(note) = poll_oracle.gate().poll() {
                            let _ = poll_tx.send(note).await;
                        }
                    }
                }
            }
        });

        // Out-of-band cache maintenance: once at startup, then daily.
        let sweep_oracle = Arc::clone(&self.oracle);
        let mut sweep_shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CACHE_SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = sweep_shutdown.changed() => {
                        if *sweep_shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        sweep_oracle.sweep_cache();
                    }
                }
            }
        });

        // HTTP surface.
        api::spawn(
            Arc::clone(&self.oracle),
            self.oracle.config.port,
            self.shutdown_rx.clone(),
        )?;

        info!("Oracle running on port {}", self.oracle.config.port);

        loop {
            tokio::select! {
                note = notes_rx.recv() => {
                    match note {
                        Some(note) => {
                            if let Some(admitted) = self.oracle.handle_note(note) {
                                let _ = admitted_tx.send(admitted).await;
                            }
                        }
                        None => {
                            info!("Note stream closed");
                            break;
                        }
                    }
                }
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        info!("Shutdown signal received");
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, initiating shutdown");
                    self.shutdown();
                    break;
                }
            }
        }

        info!("Oracle shutdown complete");
        Ok(())
    }

    /// Request the oracle to shut down.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
