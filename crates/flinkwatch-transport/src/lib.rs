//! flinkwatch Transport Layer
//!
//! Keeps a live, reconciled view of the backend's deployments:
//! - Supervisor: one long-lived watch stream with backoff and a liveness watchdog
//! - HTTP: `reqwest` transport for the event stream
//! - Detail: point-in-time fetches keyed by namespace/name
//! - Metrics: Prometheus metrics (optional feature)

pub mod api;
pub mod backoff;
pub mod config;
pub mod error;
pub mod http;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod observer;
mod probe;
pub mod state;
pub mod supervisor;
#[cfg(test)]
mod testing;
pub mod transport;
pub mod watchdog;

pub use api::{Detail, DetailClient};
pub use backoff::Backoff;
pub use config::{BackoffConfig, WatchConfig, WatchdogConfig};
pub use error::{TransportError, TransportResult};
pub use http::HttpTransport;
#[cfg(feature = "metrics")]
pub use metrics::{Metrics, MetricsServer};
pub use observer::{Observers, Subscription};
pub use state::{ConnectionState, Phase, SessionState};
pub use supervisor::WatchSession;
pub use transport::{ByteStream, Transport};
pub use watchdog::Watchdog;
