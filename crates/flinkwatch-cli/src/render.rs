//! Terminal rendering of deployments and connectivity

use colored::*;
use flinkwatch_core::Resource;
use flinkwatch_transport::{Phase, SessionState};
use serde_json::Value;
use std::sync::Arc;

/// Lifecycle state coloured like the dashboard's status tags
pub fn lifecycle_tag(state: Option<&str>) -> ColoredString {
    let state = state.unwrap_or("UNKNOWN").to_uppercase();
    match state.as_str() {
        "STABLE" => state.green(),
        "DEPLOYED" | "UPGRADING" => state.blue(),
        "ROLLING_BACK" => state.red(),
        "ROLLED_BACK" => state.yellow(),
        _ => state.normal(),
    }
}

/// Job state coloured like the dashboard's job tags
pub fn job_tag(state: Option<&str>) -> ColoredString {
    let Some(state) = state else {
        return "N/A".dimmed();
    };
    let state = state.to_uppercase();
    match state.as_str() {
        "RUNNING" | "RECONCILING" => state.blue(),
        "FINISHED" => state.green(),
        "FAILED" => state.red(),
        "CANCELING" | "RESTARTING" => state.yellow(),
        _ => state.normal(),
    }
}

/// `registry/team/job:1.20-java11` -> `1.20-java11`
pub fn image_tag(image: &str) -> &str {
    match image.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') && !repo.is_empty() => tag,
        _ => image,
    }
}

/// Whether the deployment's job is anything but RUNNING
pub fn not_running(resource: &Resource) -> bool {
    !resource
        .job_state()
        .is_some_and(|state| state.eq_ignore_ascii_case("RUNNING"))
}

/// Whether the deployment's lifecycle state is `state`, ignoring case
pub fn in_lifecycle_state(resource: &Resource, state: &str) -> bool {
    resource
        .lifecycle_state()
        .is_some_and(|current| current.eq_ignore_ascii_case(state))
}

/// One aligned row per deployment
pub fn table(resources: &[Arc<Resource>]) -> String {
    if resources.is_empty() {
        return format!("{}", "(no deployments)".dimmed());
    }

    let width = resources
        .iter()
        .map(|r| r.namespace().len() + r.name().len() + 1)
        .max()
        .unwrap_or(0)
        .max("DEPLOYMENT".len());

    let mut out = format!(
        "{:<width$}  {:<13}  {:<11}  {:<8}  {}",
        "DEPLOYMENT".bold(),
        "LIFECYCLE".bold(),
        "JOB".bold(),
        "FLINK".bold(),
        "IMAGE".bold(),
        width = width
    );

    for resource in resources {
        let image = resource
            .field("spec.image")
            .and_then(Value::as_str)
            .map(image_tag)
            .unwrap_or("-");
        out.push('\n');
        out.push_str(&format!(
            "{:<width$}  {:<13}  {:<11}  {:<8}  {}",
            resource.key().to_string(),
            lifecycle_tag(resource.lifecycle_state()),
            job_tag(resource.job_state()),
            resource.flink_version().unwrap_or("-"),
            image,
            width = width
        ));
    }

    out
}

/// One-line connectivity summary
pub fn status_line(state: &SessionState) -> String {
    let count = state.resources.len();
    let plural = if count == 1 { "" } else { "s" };

    match state.phase {
        Phase::Streaming => format!(
            "{} {} ({} deployment{})",
            "●".green(),
            "live".green(),
            count,
            plural
        ),
        Phase::Idle | Phase::Connecting => format!(
            "{} {} (attempt {})",
            "○".yellow(),
            "connecting".yellow(),
            state.generation
        ),
        Phase::Backoff => {
            let retry = state
                .next_retry
                .map(|d| format!(", retrying in {}s", d.as_secs_f64().ceil() as u64))
                .unwrap_or_default();
            format!("{} {}{}", "○".red(), "disconnected".red(), retry)
        }
        Phase::Stopped => format!("{} {}", "○".dimmed(), "stopped".dimmed()),
    }
}

/// Full status block for the `status` command
pub fn status(state: &SessionState) -> String {
    let mut out = status_line(state);
    out.push_str(&format!("\n  phase:       {}", state.phase));
    out.push_str(&format!("\n  generation:  {}", state.generation));
    out.push_str(&format!("\n  deployments: {}", state.resources.len()));
    if let Some(hint) = state.server_retry_hint {
        out.push_str(&format!("\n  server hint: retry after {}ms", hint.as_millis()));
    }
    if let Some(error) = state.last_error() {
        out.push_str(&format!("\n  last error:  {}", error.red()));
    }
    out
}

/// Pretty JSON for `show` and detail views
pub fn json(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {}>", e))
}
