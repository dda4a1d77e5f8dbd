//! The per-session polling task and the fetch-and-apply cycle it shares
//! with manual polls. Keeps a group's records eventually consistent with
//! the endpoint while guards suppress the visual half of updates.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lanecast_shared::{ResourceRecord, ResourceStatus, StatusEvent};
use tokio::sync::{Mutex, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{FIRST_POLL_ATTEMPTS, first_poll_retry_delay};
use crate::error::PollError;
use crate::state::SyncState;
use crate::wire::{self, WirePayload};

/// Inputs one poll cycle needs, cloned out of the session map so no map
/// reference is held across an await or a sink call.
#[derive(Clone)]
pub(crate) struct PollContext {
    pub group: String,
    pub endpoint: String,
    pub fallback: ResourceStatus,
    pub generation: u64,
    pub records: Arc<RwLock<Vec<ResourceRecord>>>,
    pub in_flight: Arc<Mutex<()>>,
}

/// What one fetch-and-apply cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Payload applied. `updated` counts visual dispatches, `suppressed`
    /// counts updates that reached the record but not the sink because a
    /// guard was set.
    Applied { updated: usize, suppressed: usize },
    /// The fetch failed; every tracked record was degraded to the group's
    /// fallback status once.
    Fallback,
    /// The response landed after the session was cancelled or replaced and
    /// was discarded.
    Stale,
    /// Another cycle for this group was already in flight.
    Skipped,
}

pub(crate) async fn run_session(state: SyncState, ctx: PollContext, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // A cycle that outlives its interval swallows the ticks it covered
    // instead of bursting to catch up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut first = true;

    loop {
        ticker.tick().await;
        if first {
            first = false;
            first_poll(&state, &ctx).await;
        } else {
            poll_cycle(&state, &ctx).await;
        }
    }
}

/// One fetch-and-apply cycle, shared by the session task and every manual
/// or scheduled poll.
pub(crate) async fn poll_cycle(state: &SyncState, ctx: &PollContext) -> PollOutcome {
    let Ok(_busy) = ctx.in_flight.try_lock() else {
        debug!(group = %ctx.group, "poll already in flight, skipping");
        return PollOutcome::Skipped;
    };
    state.counters.record_poll();

    match fetch_payload(state, ctx).await {
        Ok(payload) => apply_payload(state, ctx, payload).await,
        Err(e) => {
            state.counters.record_poll_failure();
            warn!(group = %ctx.group, kind = %e.kind(), error = %e, "status poll failed");
            apply_fallback(state, ctx, &e).await
        }
    }
}

/// A session's first cycle retries a few times before degrading; records
/// stay `checking` until it resolves. Steady-state ticks fail fast
/// instead.
async fn first_poll(state: &SyncState, ctx: &PollContext) -> PollOutcome {
    let Ok(_busy) = ctx.in_flight.try_lock() else {
        return PollOutcome::Skipped;
    };
    state.counters.record_poll();

    let retry_delay = first_poll_retry_delay();
    let mut attempt = 1;
    loop {
        match fetch_payload(state, ctx).await {
            Ok(payload) => return apply_payload(state, ctx, payload).await,
            Err(e) if attempt < FIRST_POLL_ATTEMPTS => {
                warn!(
                    group = %ctx.group,
                    attempt,
                    error = %e,
                    "initial status fetch failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(retry_delay).await;
            }
            Err(e) => {
                state.counters.record_poll_failure();
                warn!(group = %ctx.group, kind = %e.kind(), error = %e, "initial status fetch failed");
                return apply_fallback(state, ctx, &e).await;
            }
        }
    }
}

async fn fetch_payload(state: &SyncState, ctx: &PollContext) -> Result<WirePayload, PollError> {
    let resp = state.http.get(&ctx.endpoint).send().await?;
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(PollError::Status {
            status,
            preview: wire::preview(&body),
        });
    }

    wire::normalize(&body)
}

async fn apply_payload(state: &SyncState, ctx: &PollContext, payload: WirePayload) -> PollOutcome {
    if !state.generation_current(&ctx.group, ctx.generation) {
        state.counters.record_stale_poll_discarded();
        debug!(group = %ctx.group, "discarding late response for a stopped session");
        return PollOutcome::Stale;
    }

    let entries = match payload {
        WirePayload::PerResource { entries, skipped } => {
            if !skipped.is_empty() {
                warn!(
                    group = %ctx.group,
                    skipped = skipped.len(),
                    ids = ?skipped,
                    "payload entries without a recognizable status"
                );
            }
            entries
        }
        // One flag for the whole panel: fan it out to every tracked resource.
        WirePayload::Broadcast(status) => {
            let records = ctx.records.read().await;
            records
                .iter()
                .map(|record| (record.id.clone(), status))
                .collect()
        }
    };

    let now = Utc::now();
    let timestamp = now.to_rfc3339();
    let mut dispatches: Vec<(String, ResourceStatus)> = Vec::new();
    let mut outgoing: Vec<StatusEvent> = Vec::new();
    let mut suppressed = 0usize;
    let mut discovered = 0u64;

    {
        let mut records = ctx.records.write().await;
        // A cancel can land while this cycle waits on the lock.
        if !state.generation_current(&ctx.group, ctx.generation) {
            state.counters.record_stale_poll_discarded();
            debug!(group = %ctx.group, "discarding response for a session stopped mid-apply");
            return PollOutcome::Stale;
        }
        for (id, status) in entries {
            let (position, fresh) = match records.iter().position(|record| record.id == id) {
                Some(position) => (position, false),
                None => {
                    discovered += 1;
                    records.push(ResourceRecord::discovered(id.as_str()));
                    (records.len() - 1, true)
                }
            };

            let prior = records[position].apply(status, now);
            if fresh || prior.is_some() {
                outgoing.push(StatusEvent::Changed {
                    seq: state.allocate_seq(),
                    group: ctx.group.clone(),
                    resource: id.clone(),
                    previous: if fresh { None } else { prior },
                    status,
                    timestamp: timestamp.clone(),
                });
            }

            if state.guards.contains_key(&id) {
                suppressed += 1;
            } else {
                dispatches.push((id, status));
            }
        }
    }

    let updated = dispatches.len();
    for (id, status) in &dispatches {
        state.sink.update_visual(id, *status);
    }

    state.counters.record_updates_applied(updated as u64);
    if suppressed > 0 {
        state.counters.record_visuals_suppressed(suppressed as u64);
    }
    if discovered > 0 {
        state.counters.record_resources_discovered(discovered);
    }
    if !outgoing.is_empty() {
        info!(group = %ctx.group, changes = outgoing.len(), "status changes detected");
    }
    for event in outgoing {
        let _ = state.event_tx.send(event);
    }

    PollOutcome::Applied { updated, suppressed }
}

/// Degrade every tracked record to the group's fallback status, exactly
/// once for this failed cycle. Guards still suppress the visual half; the
/// session stays running and retries on its next tick.
async fn apply_fallback(state: &SyncState, ctx: &PollContext, error: &PollError) -> PollOutcome {
    if !state.generation_current(&ctx.group, ctx.generation) {
        state.counters.record_stale_poll_discarded();
        debug!(group = %ctx.group, "discarding late failure for a stopped session");
        return PollOutcome::Stale;
    }

    let now = Utc::now();
    let timestamp = now.to_rfc3339();
    let mut dispatches: Vec<String> = Vec::new();
    let mut outgoing: Vec<StatusEvent> = Vec::new();
    let mut suppressed = 0usize;

    {
        let mut records = ctx.records.write().await;
        if !state.generation_current(&ctx.group, ctx.generation) {
            state.counters.record_stale_poll_discarded();
            debug!(group = %ctx.group, "discarding failure for a session stopped mid-apply");
            return PollOutcome::Stale;
        }
        for record in records.iter_mut() {
            let prior = record.apply(ctx.fallback, now);
            if let Some(previous) = prior {
                outgoing.push(StatusEvent::Changed {
                    seq: state.allocate_seq(),
                    group: ctx.group.clone(),
                    resource: record.id.clone(),
                    previous: Some(previous),
                    status: ctx.fallback,
                    timestamp: timestamp.clone(),
                });
            }
            if state.guards.contains_key(&record.id) {
                suppressed += 1;
            } else {
                dispatches.push(record.id.clone());
            }
        }
    }

    for id in &dispatches {
        state.sink.update_visual(id, ctx.fallback);
    }

    outgoing.push(StatusEvent::Fallback {
        seq: state.allocate_seq(),
        group: ctx.group.clone(),
        status: ctx.fallback,
        reason: error.to_string(),
        timestamp,
    });

    state.counters.record_fallback_applied();
    state.counters.record_updates_applied(dispatches.len() as u64);
    if suppressed > 0 {
        state.counters.record_visuals_suppressed(suppressed as u64);
    }
    for event in outgoing {
        let _ = state.event_tx.send(event);
    }

    PollOutcome::Fallback
}
