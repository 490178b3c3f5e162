//! Observable session state

use flinkwatch_core::{Resource, Snapshot};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle phase of the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, no attempt made yet
    Idle,
    /// Opening the stream
    Connecting,
    /// Stream open, events flowing
    Streaming,
    /// Waiting for the scheduled reconnect
    Backoff,
    /// Torn down; terminal
    Stopped,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Connecting => write!(f, "connecting"),
            Phase::Streaming => write!(f, "streaming"),
            Phase::Backoff => write!(f, "backoff"),
            Phase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Connectivity as shown to users
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub connected: bool,
    pub last_error: Option<String>,
}

/// Immutable record published to observers after every change
#[derive(Debug, Clone)]
pub struct SessionState {
    pub resources: Snapshot,
    pub connection: ConnectionState,
    pub phase: Phase,
    /// Number of the current (or last) connection attempt
    pub generation: u64,
    /// Delay of the pending reconnect while in [`Phase::Backoff`]
    pub next_retry: Option<Duration>,
    /// Last `retry` hint sent by the server; informational only
    pub server_retry_hint: Option<Duration>,
}

impl SessionState {
    pub(crate) fn initial() -> Self {
        Self {
            resources: Snapshot::default(),
            connection: ConnectionState::default(),
            phase: Phase::Idle,
            generation: 0,
            next_retry: None,
            server_retry_hint: None,
        }
    }

    pub fn connected(&self) -> bool {
        self.connection.connected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.connection.last_error.as_deref()
    }

    /// Resources ordered by `namespace/name`
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        self.resources.resources()
    }

    pub fn find(&self, namespace: &str, name: &str) -> Option<&Arc<Resource>> {
        self.resources.find(namespace, name)
    }
}
