//! Prometheus metrics for flinkwatch
//!
//! Observability for a watch session: connection churn, traffic and
//! applied change events. Exposed in Prometheus text format via HTTP.

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Watch session metrics collector
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    // Connection metrics
    pub connection_attempts: IntCounter,
    pub connections_established: IntCounter,
    pub disconnects: IntCounterVec,
    pub connected: IntGauge,

    // Stream metrics
    pub bytes_received: IntCounter,
    pub frames_total: IntCounter,
    pub events_applied: IntCounterVec,
    pub stream_errors: IntCounter,

    // Snapshot metrics
    pub resources: IntGauge,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        let registry = Registry::new();

        let connection_attempts = IntCounter::new(
            "flinkwatch_connection_attempts_total", "Total watch stream connection attempts"
        ).unwrap();

        let connections_established = IntCounter::new(
            "flinkwatch_connections_established_total", "Total watch streams successfully opened"
        ).unwrap();

        let disconnects = IntCounterVec::new(
            Opts::new("flinkwatch_disconnects_total", "Total watch stream terminations"),
            &["reason"]
        ).unwrap();

        let connected = IntGauge::new(
            "flinkwatch_connected", "1 while the watch stream is open"
        ).unwrap();

        let bytes_received = IntCounter::new(
            "flinkwatch_bytes_received_total", "Total bytes received on the watch stream"
        ).unwrap();

        let frames_total = IntCounter::new(
            "flinkwatch_frames_total", "Total frames parsed (heartbeats excluded)"
        ).unwrap();

        let events_applied = IntCounterVec::new(
            Opts::new("flinkwatch_events_applied_total", "Total change events applied to the snapshot"),
            &["kind"]
        ).unwrap();

        let stream_errors = IntCounter::new(
            "flinkwatch_stream_errors_total", "Total error events and undecodable payloads"
        ).unwrap();

        let resources = IntGauge::new(
            "flinkwatch_resources", "Resources in the current snapshot"
        ).unwrap();

        registry.register(Box::new(connection_attempts.clone())).unwrap();
        registry.register(Box::new(connections_established.clone())).unwrap();
        registry.register(Box::new(disconnects.clone())).unwrap();
        registry.register(Box::new(connected.clone())).unwrap();
        registry.register(Box::new(bytes_received.clone())).unwrap();
        registry.register(Box::new(frames_total.clone())).unwrap();
        registry.register(Box::new(events_applied.clone())).unwrap();
        registry.register(Box::new(stream_errors.clone())).unwrap();
        registry.register(Box::new(resources.clone())).unwrap();

        Self {
            registry,
            connection_attempts,
            connections_established,
            disconnects,
            connected,
            bytes_received,
            frames_total,
            events_applied,
            stream_errors,
            resources,
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            error!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP server for the metrics endpoint
pub struct MetricsServer {
    metrics: Arc<Metrics>,
    addr: SocketAddr,
}

impl MetricsServer {
    pub fn new(metrics: Arc<Metrics>, addr: SocketAddr) -> Self {
        Self { metrics, addr }
    }

    /// Run the metrics HTTP server
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Metrics server listening on http://{}/metrics", self.addr);

        loop {
            match listener.accept().await {
                Ok((mut stream, _)) => {
                    let metrics = self.metrics.clone();

                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        if let Ok(n) = stream.read(&mut buf).await {
                            if n > 0 {
                                let request = String::from_utf8_lossy(&buf[..n]);
                                let response = Self::respond(&metrics, &request);
                                let _ = stream.write_all(response.as_bytes()).await;
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept metrics connection");
                }
            }
        }
    }

    fn respond(metrics: &Metrics, request: &str) -> String {
        if request.starts_with("GET /metrics") || request.starts_with("GET / ") {
            let body = metrics.export();
            format!(
                "HTTP/1.1 200 OK\r\n\
                 Content-Type: text/plain; version=0.0.4; charset=utf-8\r\n\
                 Content-Length: {}\r\n\
                 \r\n\
                 {}",
                body.len(),
                body
            )
        } else if request.starts_with("GET /health") {
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: 2\r\n\
             \r\n\
             OK"
                .to_string()
        } else {
            "HTTP/1.1 404 Not Found\r\n\
             Content-Length: 0\r\n\
             \r\n"
                .to_string()
        }
    }
}
