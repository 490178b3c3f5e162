//! Watch session configuration

use crate::error::{TransportError, TransportResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect backoff settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First delay after a failure, and the value restored on success
    pub floor_ms: u64,
    /// Upper bound for the delay
    pub ceiling_ms: u64,
    /// Growth factor per consecutive failed or closed connection
    pub multiplier: u32,
}

impl BackoffConfig {
    pub fn floor(&self) -> Duration {
        Duration::from_millis(self.floor_ms)
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(self.ceiling_ms)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            floor_ms: 1_000,
            ceiling_ms: 30_000,
            multiplier: 2,
        }
    }
}

/// Liveness watchdog settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// A connection with no bytes received for this long is dead.
    /// The backend sends heartbeats every 5s, so 15s is three missed ones.
    pub timeout_ms: u64,
    /// How often the timeout is checked
    pub poll_interval_ms: u64,
}

impl WatchdogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            poll_interval_ms: 5_000,
        }
    }
}

/// Everything a watch session needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Backend base URL, e.g. `http://flink-admin:8088`
    pub base_url: String,
    /// Path of the event stream below `base_url`
    pub watch_path: String,
    /// TCP connect timeout for every request
    pub connect_timeout_ms: u64,
    pub backoff: BackoffConfig,
    pub watchdog: WatchdogConfig,
}

impl WatchConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Parsed `base_url`
    pub fn base(&self) -> TransportResult<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "{}: expected an http(s) base URL",
                self.base_url
            )));
        }

        Ok(url)
    }

    /// Full URL of the event stream
    pub fn watch_url(&self) -> TransportResult<Url> {
        join_segments(self.base()?, self.watch_path.split('/'))
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8088".to_string(),
            watch_path: "/api/deployments/watch".to_string(),
            connect_timeout_ms: 10_000,
            backoff: BackoffConfig::default(),
            watchdog: WatchdogConfig::default(),
        }
    }
}

/// Append path segments to a base URL, escaping each one
pub(crate) fn join_segments<'a, I>(mut url: Url, segments: I) -> TransportResult<Url>
where
    I: IntoIterator<Item = &'a str>,
{
    let display = url.to_string();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(display))?;
        path.pop_if_empty();
        path.extend(segments.into_iter().filter(|s| !s.is_empty()));
    }
    Ok(url)
}
