//! Polling-driven status synchronization for control panels. A
//! [`StatusSyncController`] keeps named groups of resources eventually
//! consistent with their status endpoints, pushes visual updates through an
//! injected [`StatusSink`], and broadcasts state transitions as
//! [`StatusEvent`]s.

pub mod binding;
pub mod config;
pub mod controller;
pub mod error;
pub mod wire;

mod observe;
mod poller;
mod session;
mod state;

pub use binding::{NullSink, StatusSink};
pub use controller::StatusSyncController;
pub use error::{ControllerError, ErrorKind, PollError};
pub use observe::CountersSnapshot;
pub use poller::PollOutcome;
pub use wire::WirePayload;

pub use lanecast_shared::{
    GroupSnapshot, ResourceRecord, ResourceStatus, StatusEvent,
};
