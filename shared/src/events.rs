use serde::{Deserialize, Serialize};

use crate::status::ResourceStatus;

/// Broadcast to subscribers as resources move between states.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StatusEvent {
    /// A resource transitioned to a new status.
    Changed {
        #[serde(default)]
        seq: u64,
        group: String,
        resource: String,
        previous: Option<ResourceStatus>,
        status: ResourceStatus,
        timestamp: String,
    },
    /// A poll for the group failed and every tracked resource was degraded
    /// to the group's fallback status.
    Fallback {
        #[serde(default)]
        seq: u64,
        group: String,
        status: ResourceStatus,
        reason: String,
        timestamp: String,
    },
}

impl StatusEvent {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Changed { seq, .. } | Self::Fallback { seq, .. } => *seq,
        }
    }

    pub fn group(&self) -> &str {
        match self {
            Self::Changed { group, .. } | Self::Fallback { group, .. } => group,
        }
    }
}
