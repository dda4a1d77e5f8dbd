use std::fmt;

use serde::{Deserialize, Serialize};

/// Reported state of one remote resource (stream, service, camera).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    #[serde(alias = "streaming")]
    Online,
    #[serde(alias = "not-streaming")]
    Offline,
    /// Initial state before the first poll resolves.
    #[default]
    Checking,
}

impl ResourceStatus {
    pub fn from_bool(live: bool) -> Self {
        if live { Self::Online } else { Self::Offline }
    }

    /// Parse a wire spelling. Legacy endpoints report the same pair of
    /// states as `streaming`/`not-streaming` or as bare booleans.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" | "streaming" | "true" => Some(Self::Online),
            "offline" | "not-streaming" | "false" => Some(Self::Offline),
            "checking" => Some(Self::Checking),
            _ => None,
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, Self::Online)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Checking => "checking",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
