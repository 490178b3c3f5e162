//! In-memory transport and helpers for supervisor tests

use crate::error::TransportError;
use crate::state::SessionState;
use crate::supervisor::WatchSession;
use crate::transport::{ByteStream, Transport};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

/// What the next `open()` does
pub enum Script {
    /// Connection attempt fails with this reason
    Fail(String),
    /// Connection opens; chunks come from the paired [`Feed`]
    Open(mpsc::UnboundedReceiver<Result<Bytes, TransportError>>),
}

/// Server side of a scripted stream
pub struct Feed {
    tx: mpsc::UnboundedSender<Result<Bytes, TransportError>>,
}

impl Feed {
    pub fn send(&self, chunk: impl Into<String>) {
        let _ = self.tx.send(Ok(Bytes::from(chunk.into())));
    }

    pub fn fail(&self, reason: &str) {
        let _ = self.tx.send(Err(TransportError::Stream(reason.to_string())));
    }

    /// End of stream
    pub fn close(self) {}

    /// Whether the client dropped the stream
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub fn stream() -> (Feed, Script) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Feed { tx }, Script::Open(rx))
}

pub fn fail(reason: &str) -> Script {
    Script::Fail(reason.to_string())
}

/// Plays back a fixed list of connection outcomes; once exhausted every
/// further attempt hangs until cancelled
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start instants of every `open()` call
    pub fn attempts(&self) -> Arc<Mutex<Vec<Instant>>> {
        self.attempts.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self) -> Result<ByteStream, TransportError> {
        self.attempts.lock().push(Instant::now());
        let next = self.scripts.lock().pop_front();

        match next {
            Some(Script::Fail(reason)) => Err(TransportError::Stream(reason)),
            Some(Script::Open(rx)) => Ok(Box::pin(futures_util::stream::unfold(
                rx,
                |mut rx| async move { rx.recv().await.map(|item| (item, rx)) },
            ))),
            None => std::future::pending().await,
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Wait for a published state matching `pred`
pub async fn wait_until<F>(session: &WatchSession, pred: F) -> Arc<SessionState>
where
    F: Fn(&SessionState) -> bool,
{
    let notify = Arc::new(Notify::new());
    let signal = notify.clone();
    let _subscription = session.subscribe(move |_| signal.notify_one());

    tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            let state = session.state();
            if pred(&state) {
                return state;
            }
            notify.notified().await;
        }
    })
    .await
    .expect("state never reached")
}

/// `data` frame upserting a deployment
pub fn upsert(uid: &str, name: &str) -> String {
    let payload = json!({
        "type": "ADDED",
        "deployment": {
            "metadata": { "uid": uid, "name": name, "namespace": "analytics" },
            "status": { "lifecycleState": "STABLE" }
        }
    });
    format!("data: {}\n\n", payload)
}

pub fn delete(uid: &str) -> String {
    format!("data: {}\n\n", json!({ "type": "DELETED", "id": uid }))
}
