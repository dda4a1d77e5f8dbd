use lanecast_shared::ResourceStatus;

/// Visual half of a status update. The controller decides; the host
/// application renders, through whatever UI it owns. Implementations must
/// be cheap and non-blocking; they run inside the poll apply step.
///
/// The sink is only ever called for unguarded resources; a suppressed
/// update reaches the record but not the sink.
pub trait StatusSink: Send + Sync {
    fn update_visual(&self, resource_id: &str, status: ResourceStatus);
}

/// Sink for embedders that only consume snapshots and events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn update_visual(&self, _resource_id: &str, _status: ResourceStatus) {}
}
