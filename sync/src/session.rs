use std::sync::Arc;

use lanecast_shared::{ResourceRecord, ResourceStatus};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Everything one registered group owns. Lives in the controller's session
/// map; the polling task holds clones of the Arc fields, never the map
/// entry itself.
pub(crate) struct PollSession {
    pub endpoint: String,
    pub fallback: ResourceStatus,
    /// Invalidates in-flight work once the session is cancelled or replaced.
    pub generation: u64,
    pub running: bool,
    pub records: Arc<RwLock<Vec<ResourceRecord>>>,
    /// Held for one fetch-and-apply cycle; overlapping polls of the same
    /// group coalesce by failing to take it.
    pub in_flight: Arc<Mutex<()>>,
    pub task: Option<JoinHandle<()>>,
}

impl PollSession {
    pub fn new(
        endpoint: String,
        fallback: ResourceStatus,
        generation: u64,
        resource_ids: &[String],
    ) -> Self {
        let records = resource_ids
            .iter()
            .map(|id| ResourceRecord::discovered(id.as_str()))
            .collect();
        Self {
            endpoint,
            fallback,
            generation,
            running: false,
            records: Arc::new(RwLock::new(records)),
            in_flight: Arc::new(Mutex::new(())),
            task: None,
        }
    }

    /// Stop polling but keep the records readable. The generation bump turns
    /// any in-flight cycle into a discard when it lands.
    pub fn stop(&mut self, next_generation: u64) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.running = false;
        self.generation = next_generation;
    }
}

impl Drop for PollSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use lanecast_shared::ResourceStatus;

    use super::PollSession;

    #[test]
    fn new_sessions_seed_checking_records_in_registration_order() {
        let session = PollSession::new(
            "http://127.0.0.1:9/status".to_string(),
            ResourceStatus::Offline,
            7,
            &["cam0".to_string(), "cam1".to_string()],
        );
        assert!(!session.running);
        assert_eq!(session.generation, 7);

        let records = session.records.try_read().unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["cam0", "cam1"]);
        assert!(records.iter().all(|r| r.status == ResourceStatus::Checking));
    }

    #[test]
    fn stop_clears_running_and_bumps_generation() {
        let mut session = PollSession::new(
            "http://127.0.0.1:9/status".to_string(),
            ResourceStatus::Offline,
            7,
            &[],
        );
        session.running = true;
        session.stop(8);
        assert!(!session.running);
        assert_eq!(session.generation, 8);
        assert!(session.task.is_none());
    }
}
