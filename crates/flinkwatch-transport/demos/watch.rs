//! Embedded watch session
//!
//! Connects to a deployment backend, prints the connection state and the
//! deployment list on every change for one minute.
//!
//! Run with: cargo run -p flinkwatch-transport --example watch -- http://127.0.0.1:8088

use std::time::Duration;

use flinkwatch_transport::{WatchConfig, WatchSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8088".to_string());

    let config = WatchConfig::new(url);
    let session = WatchSession::connect(&config)?;

    let _subscription = session.subscribe(|state| {
        println!(
            "[{} #{}] connected={} deployments={} error={:?}",
            state.phase,
            state.generation,
            state.connected(),
            state.resources.len(),
            state.last_error()
        );
        for resource in state.resources() {
            println!(
                "  {:<40} {:<12} {}",
                resource.key().to_string(),
                resource.lifecycle_state().unwrap_or("-"),
                resource.job_state().unwrap_or("-")
            );
        }
    });

    tokio::time::sleep(Duration::from_secs(60)).await;
    session.shutdown().await;

    Ok(())
}
