//! Admission-rate control for the verification pipeline.
//!
//! Scoring a note is expensive (model call + one search per claim), so at
//! most one note per admission interval enters the pipeline. Arrivals
//! accumulate in a pending list; when the interval has elapsed the most
//! recently arrived note is admitted and the rest are discarded. Only the
//! freshest content matters for live scoring, so backlog is intentionally
//! dropped rather than queued.
//!
//! Admission is checked inline on every arrival and again by an independent
//! periodic poll, which covers the window where no new arrival triggers the
//! inline check. The gate starts closed: the first admission happens one
//! full interval after construction.

use crate::event::NoteEvent;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

struct GateState {
    pending: Vec<NoteEvent>,
    last_admission: Instant,
    dropped: u64,
}

/// Coalescing admission gate. Thread-safe; shared by the arrival path and
/// the periodic poll task.
pub struct AdmissionGate {
    interval: Duration,
    state: Mutex<GateState>,
}

impl AdmissionGate {
    /// Create a gate enforcing `interval` between admissions.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: Mutex::new(GateState {
                pending: Vec::new(),
                last_admission: Instant::now(),
                dropped: 0,
            }),
        }
    }

    /// Register an arriving note and admit one if the interval has elapsed.
    pub fn offer(&self, note: NoteEvent) -> Option<NoteEvent> {
        let mut state = self.state.lock();
        state.pending.push(note);
        self.try_admit(&mut state)
    }

    /// Periodic check: admit a pending note if the interval has elapsed.
    pub fn poll(&self) -> Option<NoteEvent> {
        let mut state = self.state.lock();
        self.try_admit(&mut state)
    }

    /// Number of notes currently pending.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Total notes discarded by coalescing since construction.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.state.lock().dropped
    }

    fn try_admit(&self, state: &mut GateState) -> Option<NoteEvent> {
        if state.pending.is_empty() {
            return None;
        }
        if state.last_admission.elapsed() < self.interval {
            return None;
        }

        let admitted = state.pending.pop()?;
        let discarded = state.pending.len();
        state.pending.clear();
        state.last_admission = Instant::now();

        if discarded > 0 {
            state.dropped += discarded as u64;
            debug!("Admitted newest pending note, discarded {discarded} older");
        }

        Some(admitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str) -> NoteEvent {
        NoteEvent::text_note(id, "author", format!("content of {id}"))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_coalesces_to_newest() {
        let gate = AdmissionGate::new(Duration::from_secs(30));

        for i in 1..=5 {
            assert!(gate.offer(note(&format!("ev{i}"))).is_none());
            tokio::time::advance(Duration::from_millis(200)).await;
        }
        assert_eq!(gate.pending_len(), 5);

        tokio::time::advance(Duration::from_secs(30)).await;
        let admitted = gate.poll().expect("one admission");
        assert_eq!(admitted.id, "ev5");
        assert_eq!(gate.pending_len(), 0);
        assert_eq!(gate.dropped(), 4);

        // Nothing left to admit
        assert!(gate.poll().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn arrival_admits_inline_once_interval_elapsed() {
        let gate = AdmissionGate::new(Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(31)).await;
        let admitted = gate.offer(note("ev1")).expect("inline admission");
        assert_eq!(admitted.id, "ev1");

        // Gate closed again right after an admission
        assert!(gate.offer(note("ev2")).is_none());
        assert_eq!(gate.pending_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_note_is_admitted_twice() {
        let gate = AdmissionGate::new(Duration::from_secs(30));
        gate.offer(note("ev1"));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(gate.poll().is_some());
        assert!(gate.poll().is_none());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(gate.poll().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn spacing_is_enforced_between_admissions() {
        let gate = AdmissionGate::new(Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(30)).await;
        gate.offer(note("ev1")).expect("first admission");

        gate.offer(note("ev2"));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(gate.poll().is_none(), "only 10s since last admission");

        tokio::time::advance(Duration::from_secs(20)).await;
        let second = gate.poll().expect("second admission");
        assert_eq!(second.id, "ev2");
    }
}
