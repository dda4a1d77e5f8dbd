use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::ResourceStatus;

/// One tracked remote resource and the last state reported for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub label: String,
    pub status: ResourceStatus,
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    /// Fresh record for a resource whose real state has not resolved yet.
    pub fn discovered(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            status: ResourceStatus::Checking,
            updated_at: Utc::now(),
        }
    }

    /// Apply a newly reported status. Returns the prior status when the
    /// report is an actual transition, `None` when it restates the current
    /// state. `updated_at` is refreshed either way.
    pub fn apply(&mut self, status: ResourceStatus, at: DateTime<Utc>) -> Option<ResourceStatus> {
        let prior = self.status;
        self.status = status;
        self.updated_at = at;
        (prior != status).then_some(prior)
    }
}

/// Point-in-time view of one polled group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub group: String,
    pub seq: u64,
    pub timestamp: String,
    pub resources: Vec<ResourceRecord>,
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::ResourceRecord;
    use crate::status::ResourceStatus;

    #[test]
    fn discovered_records_start_checking() {
        let record = ResourceRecord::discovered("cam0");
        assert_eq!(record.id, "cam0");
        assert_eq!(record.label, "cam0");
        assert_eq!(record.status, ResourceStatus::Checking);
    }

    #[test]
    fn apply_reports_transitions_only() {
        let mut record = ResourceRecord::discovered("cam0");
        let at = Utc::now();

        let prior = record.apply(ResourceStatus::Online, at);
        assert_eq!(prior, Some(ResourceStatus::Checking));
        assert_eq!(record.status, ResourceStatus::Online);
        assert_eq!(record.updated_at, at);

        let later = Utc::now();
        assert_eq!(record.apply(ResourceStatus::Online, later), None);
        assert_eq!(record.updated_at, later);
    }
}
