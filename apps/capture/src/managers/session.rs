//! Observer-visible session state.
//!
//! The state lives inside a `watch` channel. The capture manager is the only
//! writer and goes through `send_modify`, so stats and the current result
//! always change together under the channel's lock. Readers subscribe or
//! take a snapshot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use lenscast_protocol::AnalysisResult;

/// Whether the capture timer is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Running,
    #[default]
    Stopped,
}

/// Running throughput statistics for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionStats {
    pub processed_count: u64,
    pub total_response_time_ms: u64,
    pub last_response_time_ms: u64,
    pub average_response_time_ms: u64,
}

impl SessionStats {
    /// Account for one completed dispatch, successful or not.
    pub fn record(&mut self, response_time_ms: u64) {
        self.processed_count += 1;
        self.total_response_time_ms += response_time_ms;
        self.last_response_time_ms = response_time_ms;
        self.average_response_time_ms = rounded_mean(self.total_response_time_ms, self.processed_count);
    }
}

/// `round(total / count)` with halves rounded up, 0 for an empty session.
fn rounded_mean(total: u64, count: u64) -> u64 {
    if count == 0 {
        return 0;
    }
    (2 * total + count) / (2 * count)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionState {
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub mode: CaptureMode,
    pub current: Option<AnalysisResult>,
    pub stats: SessionStats,
    /// Incremented on every start; completions from an older generation are dropped.
    pub generation: u64,
    /// Cycle whose result is in `current`.
    pub applied_cycle: Option<u64>,
}

/// A completed dispatch waiting to be folded into the session.
#[derive(Debug, Clone)]
pub struct Completion {
    pub generation: u64,
    pub cycle: u64,
    pub response_time_ms: u64,
    pub result: AnalysisResult,
}

/// Shared handle to the session. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Begin a fresh session: new id, zeroed stats, no result. Returns the new generation.
    pub(crate) fn begin(&self) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|state| {
            generation = state.generation + 1;
            *state = SessionState {
                session_id: Some(Uuid::new_v4()),
                started_at: Some(Utc::now()),
                mode: CaptureMode::Running,
                generation,
                ..SessionState::default()
            };
        });
        generation
    }

    pub(crate) fn set_mode(&self, mode: CaptureMode) {
        self.tx.send_if_modified(|state| {
            if state.mode == mode {
                return false;
            }
            state.mode = mode;
            true
        });
    }

    /// Fold a completion into the session. Returns false when it was dropped
    /// because it belongs to an earlier session.
    ///
    /// With `fence_stale` set, a completion older than the applied one is
    /// counted but does not replace the current result.
    pub(crate) fn apply(&self, completion: Completion, fence_stale: bool) -> bool {
        self.tx.send_if_modified(|state| {
            if completion.generation != state.generation {
                return false;
            }

            state.stats.record(completion.response_time_ms);

            let stale = fence_stale
                && state
                    .applied_cycle
                    .map(|applied| completion.cycle < applied)
                    .unwrap_or(false);
            if !stale {
                state.current = Some(completion.result);
                state.applied_cycle = Some(completion.cycle);
            }
            true
        })
    }
}
