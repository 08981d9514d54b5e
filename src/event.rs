//! Incoming note events from the relay transport.

use serde::{Deserialize, Serialize};

/// A short text note arriving from the external relay transport.
///
/// Immutable once received. Every note is persisted and published to the raw
/// live feed regardless of whether it is admitted into the scoring pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Event identifier assigned by the origin network.
    pub id: String,
    /// Author public key.
    pub pubkey: String,
    /// Note text.
    pub content: String,
    /// Note kind tag.
    pub kind: u32,
    /// Creation time, unix seconds.
    pub created_at: i64,
}

impl NoteEvent {
    /// Build a kind-1 text note. Primarily useful in tests and manual feeds.
    #[must_use]
    pub fn text_note(id: impl Into<String>, pubkey: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pubkey: pubkey.into(),
            content: content.into(),
            kind: 1,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}
