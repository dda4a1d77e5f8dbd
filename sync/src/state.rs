use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lanecast_shared::StatusEvent;
use tokio::sync::broadcast;
use tracing::warn;

use crate::binding::StatusSink;
use crate::config::{connect_timeout, event_buffer, http_timeout};
use crate::observe::SyncCounters;
use crate::session::PollSession;

/// Shared context handed to every session task. Cloning is cheap; every
/// field is an Arc or an Arc-backed handle.
#[derive(Clone)]
pub(crate) struct SyncState {
    pub sessions: Arc<DashMap<String, PollSession>>,
    /// Resource id -> when the guard was set. Global across groups.
    pub guards: Arc<DashMap<String, DateTime<Utc>>>,
    pub next_seq: Arc<AtomicU64>,
    next_generation: Arc<AtomicU64>,
    pub event_tx: broadcast::Sender<StatusEvent>,
    pub http: reqwest::Client,
    pub sink: Arc<dyn StatusSink>,
    pub counters: Arc<SyncCounters>,
}

impl SyncState {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        let (event_tx, _) = broadcast::channel(event_buffer());
        let request_timeout = http_timeout();
        let connect = connect_timeout();
        let http = reqwest::Client::builder()
            .user_agent("lanecast/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "could not build the configured HTTP client, retrying without a user agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect)
                    .build()
            })
            .unwrap_or_else(|e| {
                panic!("HTTP client with timeouts would not build: {e}");
            });
        Self {
            sessions: Arc::new(DashMap::new()),
            guards: Arc::new(DashMap::new()),
            next_seq: Arc::new(AtomicU64::new(0)),
            next_generation: Arc::new(AtomicU64::new(0)),
            event_tx,
            http,
            sink,
            counters: Arc::new(SyncCounters::default()),
        }
    }

    pub fn allocate_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn allocate_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// True while `generation` is still the live generation for `group`.
    /// In-flight cycles re-check this after every await before touching
    /// records, so late responses for a cancelled or replaced session land
    /// nowhere.
    pub fn generation_current(&self, group: &str, generation: u64) -> bool {
        self.sessions
            .get(group)
            .map(|session| session.generation == generation)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lanecast_shared::ResourceStatus;

    use super::SyncState;
    use crate::binding::NullSink;
    use crate::session::PollSession;

    #[test]
    fn generations_are_unique_and_increasing() {
        let state = SyncState::new(Arc::new(NullSink));
        let first = state.allocate_generation();
        let second = state.allocate_generation();
        assert!(second > first);
        assert!(state.allocate_seq() < state.allocate_seq());
    }

    #[test]
    fn generation_current_tracks_the_live_session() {
        let state = SyncState::new(Arc::new(NullSink));
        assert!(!state.generation_current("cams", 1));

        let generation = state.allocate_generation();
        let session = PollSession::new(
            "http://127.0.0.1:9/status".to_string(),
            ResourceStatus::Offline,
            generation,
            &[],
        );
        state.sessions.insert("cams".to_string(), session);

        assert!(state.generation_current("cams", generation));
        assert!(!state.generation_current("cams", generation + 1));

        let next = state.allocate_generation();
        state
            .sessions
            .get_mut("cams")
            .map(|mut session| session.stop(next));
        assert!(!state.generation_current("cams", generation));
    }
}
