//! flinkwatch - live terminal view of Flink deployments
//!
//! Keeps a watch stream to the deployment backend open and shows the
//! current set of deployments as it changes.
//!
//! # Usage
//!
//! ```bash
//! # Interactive view of the local backend
//! flinkwatch
//!
//! # Remote backend, print changes until Ctrl-C
//! flinkwatch --url http://flink-admin:8088 follow
//!
//! # One detail view
//! flinkwatch get checkpoints analytics/clicks
//!
//! # With configuration file and Prometheus metrics
//! flinkwatch --config /etc/flinkwatch/flinkwatch.toml --metrics-port 9090 follow
//! ```

mod config;
mod follow;
mod render;
mod repl;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use flinkwatch_core::ResourceKey;
use flinkwatch_transport::{Detail, DetailClient, HttpTransport, Metrics, MetricsServer, WatchSession};

use crate::config::Settings;

/// flinkwatch - live view of Flink deployments
#[derive(Parser, Debug)]
#[command(name = "flinkwatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL (default: http://127.0.0.1:8088)
    #[arg(short, long, env = "FLINKWATCH_URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "FLINKWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FLINKWATCH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Serve Prometheus metrics on this port
    #[arg(long, env = "FLINKWATCH_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Quiet mode (no banner)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Interactive prompt over the live deployment list (default)
    Watch,
    /// Print deployment and connection changes until Ctrl-C
    Follow,
    /// Fetch one detail view and print it as JSON
    Get {
        /// events, checkpoints, storage or exceptions
        detail: Detail,
        /// <namespace>/<name>
        deployment: ResourceKey,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref())?.with_overrides(
        args.url,
        args.log_level,
        args.metrics_port,
    );
    let mode = args.mode.unwrap_or(Mode::Watch);

    // The interactive view stays quiet unless asked, logs would clobber the prompt
    let default_level = match mode {
        Mode::Watch => Level::WARN,
        _ => Level::INFO,
    };
    init_logging(settings.log_level.as_deref(), default_level);

    match mode {
        Mode::Get { detail, deployment } => {
            let client = DetailClient::new(&settings.watch)?;
            let value = client
                .fetch(detail, &deployment)
                .await
                .with_context(|| format!("Failed to fetch {} of {}", detail, deployment))?;
            println!("{}", render::json(&value));
            Ok(())
        }
        Mode::Follow => {
            let session = start_session(&settings)?;
            follow::run(session).await
        }
        Mode::Watch => {
            if !args.quiet {
                print_banner(&settings.watch.base_url);
            }
            let session = start_session(&settings)?;
            let details = DetailClient::new(&settings.watch)?;
            let runtime = tokio::runtime::Handle::current();

            let (session, result) = tokio::task::spawn_blocking(move || {
                let result = repl::run(&session, &details, &runtime);
                (session, result)
            })
            .await?;

            session.shutdown().await;
            result
        }
    }
}

fn init_logging(level: Option<&str>, default: Level) {
    let level = match level.map(str::to_lowercase).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("warn") => Level::WARN,
        Some("error") => Level::ERROR,
        _ => default,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Start the watch session, instrumented when a metrics port is configured
fn start_session(settings: &Settings) -> Result<WatchSession> {
    let transport = HttpTransport::new(&settings.watch)
        .with_context(|| format!("Invalid backend URL {}", settings.watch.base_url))?;

    let Some(port) = settings.metrics_port else {
        return Ok(WatchSession::start(transport, &settings.watch));
    };

    let metrics = Arc::new(Metrics::new());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server = MetricsServer::new(metrics.clone(), addr);
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "Metrics server error");
        }
    });
    info!(port, "Metrics enabled");

    Ok(WatchSession::start_with_metrics(transport, &settings.watch, metrics))
}

fn print_banner(url: &str) {
    println!(
        "{}",
        format!(
            r#"
  flinkwatch {}
  Watching {}
  Type 'help' for commands, 'quit' to exit
"#,
            env!("CARGO_PKG_VERSION"),
            url
        )
        .cyan()
    );
}
