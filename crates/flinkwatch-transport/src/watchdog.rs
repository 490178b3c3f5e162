//! Liveness watchdog for the watch stream

use crate::config::WatchdogConfig;
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Detects a connection that went silent
///
/// Every received byte (heartbeats included) counts as activity. The idle
/// time is checked on a fixed poll interval, so a dead connection is
/// reported at most one poll interval after the timeout elapsed.
pub struct Watchdog {
    timeout: Duration,
    ticker: Interval,
    last_activity: Instant,
}

impl Watchdog {
    /// Start watching; the start of the attempt counts as activity
    pub fn start(config: &WatchdogConfig) -> Self {
        let poll = config.poll_interval();
        let now = Instant::now();
        let mut ticker = interval_at(now + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            timeout: config.timeout(),
            ticker,
            last_activity: now,
        }
    }

    /// Record received traffic
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Time since the last activity
    pub fn idle(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Resolves with the idle time once the timeout has been exceeded
    ///
    /// Cancel safe: dropping the future loses no state.
    pub async fn expired(&mut self) -> Duration {
        loop {
            self.ticker.tick().await;
            let idle = self.idle();
            if idle > self.timeout {
                return idle;
            }
        }
    }
}
