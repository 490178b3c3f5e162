//! `flinkwatch follow` - print changes as they happen

use crate::render;
use anyhow::Result;
use colored::*;
use flinkwatch_core::{Resource, ResourceId};
use flinkwatch_transport::{Phase, SessionState, WatchSession};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Something worth a line of output
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Connected { generation: u64 },
    Disconnected { error: Option<String>, retry: Option<Duration> },
    Added(Arc<Resource>),
    Updated { before: Arc<Resource>, after: Arc<Resource> },
    Removed(Arc<Resource>),
}

struct Seen {
    resource: Arc<Resource>,
    generation: u64,
}

/// Turns the sequence of published states into changes
///
/// Every reconnect starts from an empty snapshot and replays, so a
/// resource is reported removed when it disappears within the connection
/// it was last seen on. Replayed resources with unchanged content stay
/// silent. A resource that was not replayed at all by the previous
/// connection is reported removed once the next connection opens.
#[derive(Default)]
pub struct Follower {
    view: HashMap<ResourceId, Seen>,
    phase: Option<Phase>,
    /// Generation of the last connection that reached Streaming
    streamed: Option<u64>,
}

impl Follower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, state: &SessionState) -> Vec<Change> {
        let mut changes = Vec::new();
        let entered = self.phase != Some(state.phase);
        self.phase = Some(state.phase);

        match state.phase {
            Phase::Streaming => {
                if entered {
                    changes.push(Change::Connected {
                        generation: state.generation,
                    });
                }
                if self.streamed != Some(state.generation) {
                    if let Some(previous) = self.streamed {
                        changes.extend(self.evict_older_than(previous));
                    }
                    self.streamed = Some(state.generation);
                }
            }
            Phase::Backoff if entered => {
                changes.push(Change::Disconnected {
                    error: state.connection.last_error.clone(),
                    retry: state.next_retry,
                });
                return changes;
            }
            _ => return changes,
        }

        for (id, resource) in state.resources.iter() {
            match self.view.get_mut(id) {
                None => {
                    changes.push(Change::Added(resource.clone()));
                    self.view.insert(
                        id.clone(),
                        Seen {
                            resource: resource.clone(),
                            generation: state.generation,
                        },
                    );
                }
                Some(seen) => {
                    if !Arc::ptr_eq(&seen.resource, resource) && seen.resource != *resource {
                        changes.push(Change::Updated {
                            before: seen.resource.clone(),
                            after: resource.clone(),
                        });
                    }
                    seen.resource = resource.clone();
                    seen.generation = state.generation;
                }
            }
        }

        let gone: Vec<ResourceId> = self
            .view
            .iter()
            .filter(|(id, seen)| seen.generation == state.generation && !state.resources.contains(id))
            .map(|(id, _)| id.clone())
            .collect();
        for id in gone {
            if let Some(seen) = self.view.remove(&id) {
                changes.push(Change::Removed(seen.resource));
            }
        }

        changes
    }

    /// Drop resources last seen before `generation`
    fn evict_older_than(&mut self, generation: u64) -> Vec<Change> {
        let stale: Vec<ResourceId> = self
            .view
            .iter()
            .filter(|(_, seen)| seen.generation < generation)
            .map(|(id, _)| id.clone())
            .collect();

        let mut removed: Vec<Arc<Resource>> = stale
            .iter()
            .filter_map(|id| self.view.remove(id))
            .map(|seen| seen.resource)
            .collect();
        removed.sort_by_key(|r| r.key());
        removed.into_iter().map(Change::Removed).collect()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.view.len()
    }
}

/// Render a change as one line
pub fn describe(change: &Change) -> String {
    match change {
        Change::Connected { generation } => {
            format!("{} connected (attempt {})", "●".green(), generation)
        }
        Change::Disconnected { error, retry } => {
            let mut line = format!("{} disconnected", "○".red());
            if let Some(error) = error {
                line.push_str(&format!(": {}", error));
            }
            if let Some(retry) = retry {
                line.push_str(&format!(" (retrying in {}ms)", retry.as_millis()));
            }
            line
        }
        Change::Added(resource) => format!(
            "{} {}  {}  {}",
            "+".green(),
            resource.key(),
            render::lifecycle_tag(resource.lifecycle_state()),
            render::job_tag(resource.job_state())
        ),
        Change::Updated { before, after } => {
            let mut line = format!("{} {}", "~".yellow(), after.key());
            if before.lifecycle_state() != after.lifecycle_state() {
                line.push_str(&format!(
                    "  {} -> {}",
                    render::lifecycle_tag(before.lifecycle_state()),
                    render::lifecycle_tag(after.lifecycle_state())
                ));
            }
            if before.job_state() != after.job_state() {
                line.push_str(&format!(
                    "  job {} -> {}",
                    render::job_tag(before.job_state()),
                    render::job_tag(after.job_state())
                ));
            }
            line
        }
        Change::Removed(resource) => format!("{} {}", "-".red(), resource.key()),
    }
}

/// Print changes until Ctrl-C
pub async fn run(session: WatchSession) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionState>();
    let _subscription = session.subscribe(move |state| {
        let _ = tx.send(state.clone());
    });

    let mut follower = Follower::new();
    for change in follower.observe(&session.state()) {
        println!("{}", describe(&change));
    }

    loop {
        tokio::select! {
            state = rx.recv() => {
                let Some(state) = state else { break };
                for change in follower.observe(&state) {
                    println!("{}", describe(&change));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}
