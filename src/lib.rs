//! Real-time credibility scoring node for the Nostr network.
//!
//! nostr-oracle listens to a stream of short text notes, extracts the factual
//! claims they make, cross-checks each claim against a news-search corpus and
//! publishes a 0-100 credibility score to live subscribers while persisting
//! every result. Authors of high-scoring notes receive a proportional
//! Lightning tip.
//!
//! # Architecture
//!
//! ```text
//! relay stream ──▶ AdmissionGate ──▶ ClaimExtractor ──▶ Verifier ──▶ Store
//!   (external)     (coalescing)       (AI ▸ patterns)     │            │
//!                                                         ▼            ▼
//!                                                    ClaimCache   SystemStats
//!                                                         │
//!                                         RewardService ◀─┴─▶ FanoutHub
//!                                          (zap > 80)        (topic pub/sub)
//! ```
//!
//! The expensive pipeline admits at most one note per configured interval;
//! bursts coalesce to the freshest note. Manual submissions through the HTTP
//! surface bypass the gate entirely.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod extract;
pub mod fanout;
pub mod intake;
pub mod node;
pub mod reward;
pub mod storage;
pub mod verify;

pub use config::OracleConfig;
pub use error::{Error, Result};
pub use event::NoteEvent;
pub use node::{OracleBuilder, RunningOracle};
pub use verify::{ClaimVerification, VerificationResult};
