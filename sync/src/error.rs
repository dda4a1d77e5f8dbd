use std::fmt;

use thiserror::Error;

/// Coarse failure classification. Network and protocol failures are handled
/// identically (fallback, log, keep polling); application failures come from
/// a payload that parsed but signals a server-side error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Protocol,
    Application,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::Protocol => "protocol",
            Self::Application => "application",
        })
    }
}

/// Why one poll cycle failed.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("upstream status {status}; body preview: {preview}")]
    Status {
        status: reqwest::StatusCode,
        preview: String,
    },
    #[error("failed to decode status payload: {source}; body preview: {preview}")]
    Decode {
        source: serde_json::Error,
        preview: String,
    },
    #[error("unsupported payload shape: {0}")]
    UnsupportedShape(String),
    #[error("endpoint reported failure: {0}")]
    Application(String),
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Status { .. } | Self::Decode { .. } | Self::UnsupportedShape(_) => {
                ErrorKind::Protocol
            }
            Self::Application(_) => ErrorKind::Application,
        }
    }
}

/// Errors surfaced by the controller API itself. Poll failures never show up
/// here; they degrade records and keep the session running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("poll interval must be greater than zero for group {0}")]
    InvalidInterval(String),
    #[error("unknown group {0}")]
    UnknownGroup(String),
}
