use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use lanecast_shared::{GroupSnapshot, ResourceStatus, StatusEvent};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::binding::StatusSink;
use crate::config;
use crate::error::ControllerError;
use crate::observe::CountersSnapshot;
use crate::poller::{self, PollContext, PollOutcome};
use crate::session::PollSession;
use crate::state::SyncState;

/// Keeps a named set of resource records eventually consistent with
/// server-reported state. One poll session per group; suppression guards
/// keep user-held UI out of the update path; failures degrade records and
/// never stop a session. Dropping the controller tears every session down.
pub struct StatusSyncController {
    state: SyncState,
}

impl StatusSyncController {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self {
            state: SyncState::new(sink),
        }
    }

    /// Create or replace the poll session for `group_id` with the default
    /// offline fallback. The listed resources are seeded as `checking` and
    /// painted; the session's task polls immediately, then every
    /// `interval` ([`config::DEFAULT_POLL_INTERVAL_MS`] is the
    /// conventional cadence). Replacing stops the old session before the
    /// new one starts, so exactly one poller per group ever runs.
    pub fn register<I, S>(
        &self,
        group_id: impl Into<String>,
        resource_ids: I,
        endpoint: impl Into<String>,
        interval: Duration,
    ) -> Result<(), ControllerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.register_with_fallback(
            group_id,
            resource_ids,
            endpoint,
            interval,
            ResourceStatus::Offline,
        )
    }

    /// `register` with an explicit per-session fallback status for failed
    /// polls.
    pub fn register_with_fallback<I, S>(
        &self,
        group_id: impl Into<String>,
        resource_ids: I,
        endpoint: impl Into<String>,
        interval: Duration,
        fallback: ResourceStatus,
    ) -> Result<(), ControllerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group = group_id.into();
        if interval.is_zero() {
            return Err(ControllerError::InvalidInterval(group));
        }
        let endpoint = endpoint.into();
        let ids: Vec<String> = resource_ids.into_iter().map(Into::into).collect();

        // The old session transitions to Stopped before the new one starts.
        if let Some((_, old)) = self.state.sessions.remove(&group) {
            info!(group = %group, "replacing poll session");
            drop(old);
        }

        let generation = self.state.allocate_generation();
        let mut session = PollSession::new(endpoint.clone(), fallback, generation, &ids);
        session.running = true;

        // Seeded records show as checking until the first poll resolves.
        for id in &ids {
            if !self.state.guards.contains_key(id) {
                self.state.sink.update_visual(id, ResourceStatus::Checking);
            }
        }

        let ctx = PollContext {
            group: group.clone(),
            endpoint,
            fallback,
            generation,
            records: Arc::clone(&session.records),
            in_flight: Arc::clone(&session.in_flight),
        };

        // Insert before spawning: the task's first cycle checks the live
        // generation in the map.
        self.state.sessions.insert(group.clone(), session);
        let task = tokio::spawn(poller::run_session(self.state.clone(), ctx, interval));
        match self.state.sessions.get_mut(&group) {
            Some(mut session) if session.generation == generation => {
                session.task = Some(task);
            }
            // A concurrent replace already took the slot; this task must
            // not outlive its registration.
            _ => task.abort(),
        }

        info!(
            group = %group,
            interval_ms = interval.as_millis() as u64,
            resources = ids.len(),
            "poll session started"
        );
        Ok(())
    }

    /// One manual fetch-and-apply cycle, e.g. right after a control action.
    /// Coalesces with any cycle already in flight for the group. Works on a
    /// cancelled session too; only the recurring timer is gone then.
    pub async fn poll(&self, group_id: &str) -> Result<PollOutcome, ControllerError> {
        let ctx = self.poll_context(group_id)?;
        Ok(poller::poll_cycle(&self.state, &ctx).await)
    }

    /// Stop polling for `group_id`. Idempotent; cancelling an unknown or
    /// already-stopped group is a no-op. Records stay readable and a fetch
    /// already in flight is discarded when it lands.
    pub fn cancel(&self, group_id: &str) {
        let Some(mut session) = self.state.sessions.get_mut(group_id) else {
            return;
        };
        if !session.running {
            return;
        }
        let next = self.state.allocate_generation();
        session.stop(next);
        info!(group = %group_id, "poll session cancelled");
    }

    /// Set or clear the suppression guard for a resource (modal open /
    /// modal close). While set, polls still refresh the record but never
    /// touch the visual binding.
    pub fn set_guard(&self, resource_id: &str, active: bool) {
        if active {
            self.state.guards.insert(resource_id.to_string(), Utc::now());
        } else {
            self.state.guards.remove(resource_id);
        }
    }

    pub fn is_guarded(&self, resource_id: &str) -> bool {
        self.state.guards.contains_key(resource_id)
    }

    pub fn is_running(&self, group_id: &str) -> bool {
        self.state
            .sessions
            .get(group_id)
            .map(|session| session.running)
            .unwrap_or(false)
    }

    pub fn groups(&self) -> Vec<String> {
        self.state
            .sessions
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Current records for one group, in registration-then-discovery order.
    pub async fn snapshot(&self, group_id: &str) -> Option<GroupSnapshot> {
        let records = {
            let session = self.state.sessions.get(group_id)?;
            Arc::clone(&session.records)
        };
        let resources = records.read().await.clone();
        Some(GroupSnapshot {
            group: group_id.to_string(),
            seq: self.state.next_seq.load(Ordering::Relaxed),
            timestamp: Utc::now().to_rfc3339(),
            resources,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.state.event_tx.subscribe()
    }

    pub fn event_stream(&self) -> BroadcastStream<StatusEvent> {
        BroadcastStream::new(self.subscribe())
    }

    /// Schedule one extra poll after `delay`: the quiet refresh a caller
    /// wants after POSTing a control action, once the backend has settled
    /// ([`config::DEFAULT_REFRESH_SOON_DELAY_MS`] is the conventional
    /// delay). Cancelling or replacing the session first turns it into a
    /// no-op.
    pub fn refresh_soon(&self, group_id: &str, delay: Duration) -> Result<(), ControllerError> {
        let ctx = self.poll_context(group_id)?;
        let state = self.state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if state.generation_current(&ctx.group, ctx.generation) {
                poller::poll_cycle(&state, &ctx).await;
            }
        });
        Ok(())
    }

    /// Poll every registered group once, with bounded concurrency. Returns
    /// per-group outcomes in completion order.
    pub async fn refresh_all(&self) -> Vec<(String, PollOutcome)> {
        let contexts: Vec<PollContext> = self
            .state
            .sessions
            .iter()
            .map(|entry| Self::context_from(entry.key(), entry.value()))
            .collect();

        futures::stream::iter(contexts)
            .map(|ctx| {
                let state = self.state.clone();
                async move {
                    let outcome = poller::poll_cycle(&state, &ctx).await;
                    (ctx.group, outcome)
                }
            })
            .buffer_unordered(config::refresh_max_concurrency())
            .collect()
            .await
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.state.counters.snapshot()
    }

    fn context_from(group: &str, session: &PollSession) -> PollContext {
        PollContext {
            group: group.to_string(),
            endpoint: session.endpoint.clone(),
            fallback: session.fallback,
            generation: session.generation,
            records: Arc::clone(&session.records),
            in_flight: Arc::clone(&session.in_flight),
        }
    }

    fn poll_context(&self, group_id: &str) -> Result<PollContext, ControllerError> {
        let session = self
            .state
            .sessions
            .get(group_id)
            .ok_or_else(|| ControllerError::UnknownGroup(group_id.to_string()))?;
        Ok(Self::context_from(group_id, &session))
    }
}

impl Drop for StatusSyncController {
    fn drop(&mut self) {
        // Session tasks and scheduled refreshes hold clones of the shared
        // state and would keep running after the controller is gone.
        // Dropping the sessions aborts their tasks; the emptied map fails
        // every later generation check.
        self.state.sessions.clear();
    }
}
