//! Exponential reconnect backoff

use crate::config::BackoffConfig;
use std::time::Duration;

/// Delay schedule between reconnection attempts
///
/// Starts at the floor, grows by the multiplier after every scheduled
/// reconnect and never exceeds the ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    multiplier: u32,
    current: Duration,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        let ceiling = config.ceiling();
        let floor = config.floor().min(ceiling);

        Self {
            floor,
            ceiling,
            multiplier: config.multiplier.max(1),
            current: floor,
        }
    }

    /// Delay the next reconnect would wait
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Take the delay for a reconnect and grow the next one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(self.multiplier).min(self.ceiling);
        delay
    }

    /// Back to the floor (after a successful connection or a manual retry)
    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(&BackoffConfig::default())
    }
}
