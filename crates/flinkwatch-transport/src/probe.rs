//! Supervisor instrumentation, backed by Prometheus when the `metrics`
//! feature is enabled and a no-op otherwise

#[cfg(feature = "metrics")]
use crate::metrics::Metrics;
#[cfg(feature = "metrics")]
use std::sync::Arc;

#[derive(Clone, Default)]
pub(crate) struct Probe {
    #[cfg(feature = "metrics")]
    metrics: Option<Arc<Metrics>>,
}

impl Probe {
    #[cfg(feature = "metrics")]
    pub fn new(metrics: Option<Arc<Metrics>>) -> Self {
        Self { metrics }
    }

    #[cfg(feature = "metrics")]
    fn with(&self, f: impl FnOnce(&Metrics)) {
        if let Some(metrics) = self.metrics.as_deref() {
            f(metrics);
        }
    }

    pub fn connection_attempt(&self) {
        #[cfg(feature = "metrics")]
        self.with(|m| m.connection_attempts.inc());
    }

    pub fn connected(&self) {
        #[cfg(feature = "metrics")]
        self.with(|m| {
            m.connections_established.inc();
            m.connected.set(1);
        });
    }

    pub fn disconnected(&self, reason: &str) {
        #[cfg(feature = "metrics")]
        self.with(|m| {
            m.disconnects.with_label_values(&[reason]).inc();
            m.connected.set(0);
        });
        #[cfg(not(feature = "metrics"))]
        let _ = reason;
    }

    pub fn bytes_received(&self, n: usize) {
        #[cfg(feature = "metrics")]
        self.with(|m| m.bytes_received.inc_by(n as u64));
        #[cfg(not(feature = "metrics"))]
        let _ = n;
    }

    pub fn frame(&self) {
        #[cfg(feature = "metrics")]
        self.with(|m| m.frames_total.inc());
    }

    pub fn event_applied(&self, kind: &str) {
        #[cfg(feature = "metrics")]
        self.with(|m| m.events_applied.with_label_values(&[kind]).inc());
        #[cfg(not(feature = "metrics"))]
        let _ = kind;
    }

    pub fn stream_error(&self) {
        #[cfg(feature = "metrics")]
        self.with(|m| m.stream_errors.inc());
    }

    pub fn resources(&self, count: usize) {
        #[cfg(feature = "metrics")]
        self.with(|m| m.resources.set(count as i64));
        #[cfg(not(feature = "metrics"))]
        let _ = count;
    }
}
