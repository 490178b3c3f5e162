//! Connection supervisor
//!
//! One worker task per [`WatchSession`] owns the transport stream, the frame
//! parser, the backoff schedule and the watchdog. It is the only writer of
//! the snapshot store. Callers talk to it through a control channel and read
//! the immutable [`SessionState`] it publishes after every change.
//!
//! ```text
//! Idle -> Connecting -> Streaming -> (closed | failed) -> Backoff -> Connecting ...
//!              ^--------------- retry_now() from any phase ---------------'
//! ```

use crate::backoff::Backoff;
use crate::config::{WatchConfig, WatchdogConfig};
use crate::error::{TransportError, TransportResult};
use crate::http::HttpTransport;
#[cfg(feature = "metrics")]
use crate::metrics::Metrics;
use crate::observer::{Observers, Subscription};
use crate::probe::Probe;
use crate::state::{ConnectionState, Phase, SessionState};
use crate::transport::Transport;
use crate::watchdog::Watchdog;
use flinkwatch_core::{Applied, Resource, SnapshotStore};
use flinkwatch_protocol::{decode, Disposition, Frame, FrameParser, ProtocolError};
use futures_util::StreamExt;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Requests from the session handle to its worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Retry,
    Shutdown,
}

/// How a connection attempt ended
#[derive(Debug)]
enum Outcome {
    /// Server ended the stream
    Closed,
    /// Transport error, protocol overflow or watchdog timeout
    Failed(TransportError),
    /// Manual retry requested
    Retry,
    /// Session torn down
    Shutdown,
}

/// State shared between the handle and the worker
struct Shared {
    state: RwLock<Arc<SessionState>>,
    store: SnapshotStore,
    observers: Arc<Observers>,
}

/// A live, self-healing view of the backend's deployments
///
/// Dropping the session stops the worker and closes the connection.
pub struct WatchSession {
    control: mpsc::UnboundedSender<Control>,
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl WatchSession {
    /// Start supervising `transport`; must be called within a tokio runtime
    pub fn start<T: Transport>(transport: T, config: &WatchConfig) -> Self {
        Self::spawn(Arc::new(transport), config, Probe::default())
    }

    /// Start with Prometheus instrumentation
    #[cfg(feature = "metrics")]
    pub fn start_with_metrics<T: Transport>(
        transport: T,
        config: &WatchConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self::spawn(Arc::new(transport), config, Probe::new(Some(metrics)))
    }

    /// Watch the backend at `config.base_url` over HTTP
    pub fn connect(config: &WatchConfig) -> TransportResult<Self> {
        Ok(Self::start(HttpTransport::new(config)?, config))
    }

    fn spawn(transport: Arc<dyn Transport>, config: &WatchConfig, probe: Probe) -> Self {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            state: RwLock::new(Arc::new(SessionState::initial())),
            store: SnapshotStore::new(),
            observers: Observers::new(),
        });

        let supervisor = Supervisor {
            transport,
            watchdog: config.watchdog.clone(),
            backoff: Backoff::new(&config.backoff),
            control: control_rx,
            shared: shared.clone(),
            probe,
            generation: 0,
            connection: ConnectionState::default(),
            phase: Phase::Idle,
            next_retry: None,
            server_retry_hint: None,
        };

        Self {
            control: control_tx,
            shared,
            task: Some(tokio::spawn(supervisor.run())),
        }
    }

    /// Latest published state
    pub fn state(&self) -> Arc<SessionState> {
        self.shared.state.read().clone()
    }

    /// Resources ordered by `namespace/name`
    pub fn resources(&self) -> Vec<Arc<Resource>> {
        self.state().resources()
    }

    pub fn find(&self, namespace: &str, name: &str) -> Option<Arc<Resource>> {
        self.state().find(namespace, name).cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().connection.last_error.clone()
    }

    /// Drop the current connection or pending reconnect and connect now,
    /// with the backoff back at its floor
    pub fn retry_now(&self) {
        let _ = self.control.send(Control::Retry);
    }

    /// Get called with every published state
    ///
    /// Listeners run on the worker task and must not block.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.shared.observers.subscribe(listener)
    }

    /// Stop the worker and wait for it to finish
    pub async fn shutdown(mut self) {
        let _ = self.control.send(Control::Shutdown);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Watch worker did not stop cleanly");
            }
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.control.send(Control::Shutdown);
            task.abort();
        }
    }
}

impl std::fmt::Debug for WatchSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("WatchSession")
            .field("phase", &state.phase)
            .field("generation", &state.generation)
            .field("connected", &state.connected())
            .field("resources", &state.resources.len())
            .finish()
    }
}

/// The worker
struct Supervisor {
    transport: Arc<dyn Transport>,
    watchdog: WatchdogConfig,
    backoff: Backoff,
    control: mpsc::UnboundedReceiver<Control>,
    shared: Arc<Shared>,
    probe: Probe,

    generation: u64,
    connection: ConnectionState,
    phase: Phase,
    next_retry: Option<Duration>,
    server_retry_hint: Option<Duration>,
}

impl Supervisor {
    async fn run(mut self) {
        info!(transport = %self.transport.describe(), "Watch session started");

        let mut outcome = self.connect_and_stream().await;
        loop {
            let delay = match outcome {
                Outcome::Shutdown => break,
                Outcome::Retry => {
                    info!(generation = self.generation, "Manual retry, reconnecting now");
                    if self.connection.connected {
                        self.probe.disconnected("retry");
                    }
                    self.backoff.reset();
                    outcome = self.connect_and_stream().await;
                    continue;
                }
                Outcome::Closed => self.schedule_reconnect(None),
                Outcome::Failed(e) => self.schedule_reconnect(Some(e)),
            };

            outcome = match self.wait(delay).await {
                Some(control) => control,
                None => self.connect_and_stream().await,
            };
        }

        self.stop();
    }

    /// One connection attempt, from opening the stream until it ends
    async fn connect_and_stream(&mut self) -> Outcome {
        self.generation += 1;
        let generation = self.generation;
        self.phase = Phase::Connecting;
        self.connection.connected = false;
        self.next_retry = None;
        self.probe.connection_attempt();
        self.publish();
        debug!(generation, "Connecting");

        let mut watchdog = Watchdog::start(&self.watchdog);

        let opened = tokio::select! {
            biased;
            control = self.control.recv() => return self.on_control(control),
            opened = self.transport.open() => opened,
            idle = watchdog.expired() => return Outcome::Failed(TransportError::Timeout(idle)),
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return Outcome::Failed(e),
        };

        self.shared.store.reset();
        self.backoff.reset();
        self.phase = Phase::Streaming;
        self.connection = ConnectionState {
            connected: true,
            last_error: None,
        };
        self.probe.connected();
        self.publish();
        info!(generation, "Watch stream opened");

        let mut parser = FrameParser::new();
        loop {
            tokio::select! {
                biased;
                control = self.control.recv() => return self.on_control(control),
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        watchdog.touch();
                        if let Err(e) = self.process_chunk(&mut parser, &bytes) {
                            return Outcome::Failed(e.into());
                        }
                    }
                    Some(Err(e)) => return Outcome::Failed(e),
                    None => {
                        let dropped = parser.finish();
                        if dropped > 0 {
                            debug!(generation, dropped, "Discarding incomplete frame at end of stream");
                        }
                        return Outcome::Closed;
                    }
                },
                idle = watchdog.expired() => return Outcome::Failed(TransportError::Timeout(idle)),
            }
        }
    }

    /// Feed a chunk and apply every frame it completes; publishes once
    fn process_chunk(&mut self, parser: &mut FrameParser, chunk: &[u8]) -> Result<(), ProtocolError> {
        self.probe.bytes_received(chunk.len());
        parser.feed(chunk);

        let mut changed = false;
        let result = loop {
            match parser.parse() {
                Ok(Some(frame)) => changed |= self.handle_frame(frame),
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        if changed {
            self.publish();
        }
        result
    }

    /// Returns whether the frame changed the published state
    fn handle_frame(&mut self, frame: Frame) -> bool {
        self.probe.frame();
        let mut changed = false;

        if let Some(ms) = frame.retry {
            let hint = Duration::from_millis(ms);
            if self.server_retry_hint != Some(hint) {
                debug!(retry_ms = ms, "Server reconnect hint");
                self.server_retry_hint = Some(hint);
                changed = true;
            }
        }

        match decode(&frame) {
            Disposition::Apply(event) => {
                let label = event.label();
                let id = event.id().clone();
                match self.shared.store.apply(event) {
                    Applied::Unchanged => trace!(id = %id, "Removal of unknown resource"),
                    applied => {
                        trace!(id = %id, ?applied, "Change applied");
                        self.probe.event_applied(label);
                        changed = true;
                    }
                }
            }
            Disposition::Error(message) => {
                warn!(generation = self.generation, error = %message, "Watch stream reported an error");
                self.probe.stream_error();
                self.connection.last_error = Some(message);
                changed = true;
            }
            Disposition::Ignore => {}
        }

        changed
    }

    fn on_control(&mut self, control: Option<Control>) -> Outcome {
        match control {
            Some(Control::Retry) => {
                // Requests queued meanwhile collapse into this one
                while let Ok(queued) = self.control.try_recv() {
                    if queued == Control::Shutdown {
                        return Outcome::Shutdown;
                    }
                }
                Outcome::Retry
            }
            Some(Control::Shutdown) | None => Outcome::Shutdown,
        }
    }

    /// Enter backoff; returns the delay before the next attempt
    fn schedule_reconnect(&mut self, error: Option<TransportError>) -> Duration {
        let delay = self.backoff.next_delay();
        let delay_ms = delay.as_millis() as u64;

        match error {
            None => {
                info!(generation = self.generation, delay_ms, "Watch stream ended, reconnecting");
                self.probe.disconnected("closed");
            }
            Some(e) => {
                warn!(generation = self.generation, delay_ms, error = %e, "Watch stream failed, reconnecting");
                self.probe.disconnected(disconnect_reason(&e));
                self.connection.last_error = Some(e.to_string());
            }
        }

        self.connection.connected = false;
        self.phase = Phase::Backoff;
        self.next_retry = Some(delay);
        self.publish();
        delay
    }

    /// Sleep through the backoff delay; `None` once it elapsed
    async fn wait(&mut self, delay: Duration) -> Option<Outcome> {
        tokio::select! {
            biased;
            control = self.control.recv() => Some(self.on_control(control)),
            _ = tokio::time::sleep(delay) => None,
        }
    }

    fn stop(&mut self) {
        if self.connection.connected {
            self.probe.disconnected("shutdown");
        }
        self.connection.connected = false;
        self.phase = Phase::Stopped;
        self.next_retry = None;
        self.publish();
        debug!(generation = self.generation, "Watch session stopped");
    }

    fn publish(&self) {
        let resources = self.shared.store.snapshot();
        self.probe.resources(resources.len());

        let state = Arc::new(SessionState {
            resources,
            connection: self.connection.clone(),
            phase: self.phase,
            generation: self.generation,
            next_retry: self.next_retry,
            server_retry_hint: self.server_retry_hint,
        });

        *self.shared.state.write() = state.clone();
        self.shared.observers.notify(&state);
    }
}

fn disconnect_reason(error: &TransportError) -> &'static str {
    match error {
        TransportError::Timeout(_) => "timeout",
        TransportError::Protocol(_) => "protocol",
        TransportError::Status { .. } => "status",
        _ => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{delete, fail, stream, upsert, wait_until, ScriptedTransport};
    use flinkwatch_protocol::decoder::UNSPECIFIED_SERVER_ERROR;
    use flinkwatch_protocol::parser::MAX_FRAME_SIZE;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn start(scripts: Vec<crate::testing::Script>) -> (WatchSession, Arc<Mutex<Vec<Instant>>>) {
        let transport = ScriptedTransport::new(scripts);
        let attempts = transport.attempts();
        (WatchSession::start(transport, &WatchConfig::default()), attempts)
    }

    fn uids(state: &SessionState) -> Vec<String> {
        state
            .resources()
            .iter()
            .map(|r| r.metadata.uid.clone())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_applies_events_in_order() {
        let (feed, script) = stream();
        let (session, _) = start(vec![script]);

        feed.send(upsert("u-1", "clicks"));
        feed.send(upsert("u-2", "orders"));
        feed.send(delete("u-1"));
        feed.send(delete("u-1"));

        let state = wait_until(&session, |s| s.resources.revision() >= 4).await;
        assert_eq!(uids(&state), vec!["u-2"]);
        assert!(state.connected());
        assert_eq!(state.phase, Phase::Streaming);
        assert_eq!(state.last_error(), None);
        assert!(session.find("analytics", "orders").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_before_replay() {
        let (first, first_script) = stream();
        let (second, second_script) = stream();
        let (session, _) = start(vec![first_script, second_script]);

        first.send(upsert("u-1", "clicks"));
        first.send(upsert("u-2", "orders"));
        wait_until(&session, |s| s.resources.len() == 2).await;

        first.close();
        let state = wait_until(&session, |s| s.generation == 2 && s.connected()).await;
        assert!(state.resources.is_empty());

        second.send(upsert("u-2", "orders"));
        let state = wait_until(&session, |s| !s.resources.is_empty()).await;
        assert_eq!(uids(&state), vec!["u-2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_split_across_chunks() {
        let (feed, script) = stream();
        let (session, _) = start(vec![script]);
        let frame = upsert("u-1", "clicks");
        let (head, tail) = frame.split_at(frame.len() / 2);

        feed.send(head);
        feed.send(tail);

        let state = wait_until(&session, |s| !s.resources.is_empty()).await;
        assert_eq!(uids(&state), vec!["u-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_keep_connection_alive() {
        let (feed, script) = stream();
        let (session, attempts) = start(vec![script]);
        wait_until(&session, |s| s.connected()).await;

        let published = Arc::new(AtomicUsize::new(0));
        let counter = published.clone();
        let _subscription = session.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..12 {
            tokio::time::sleep(Duration::from_secs(5)).await;
            feed.send(": heartbeat\n\n");
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        let state = session.state();
        assert!(state.connected());
        assert_eq!(state.generation, 1);
        assert_eq!(attempts.lock().len(), 1);
        assert_eq!(published.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_trip() {
        let (feed, script) = stream();
        let (session, _) = start(vec![script]);
        let started = Instant::now();
        wait_until(&session, |s| s.connected()).await;

        let state = wait_until(&session, |s| s.phase == Phase::Backoff).await;

        assert_eq!(started.elapsed(), Duration::from_secs(20));
        assert!(!state.connected());
        assert!(state.last_error().unwrap().contains("no data received"));
        assert_eq!(state.next_retry, Some(Duration::from_secs(1)));
        assert!(feed.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_and_caps() {
        let scripts = (0..6).map(|i| fail(&format!("refused {}", i))).collect();
        let (session, attempts) = start(scripts);

        wait_until(&session, |s| s.generation == 7).await;

        let attempts = attempts.lock();
        let gaps: Vec<u64> = attempts
            .windows(2)
            .map(|w| (w[1] - w[0]).as_millis() as u64)
            .collect();
        assert_eq!(gaps, vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000]);
        assert_eq!(session.last_error().as_deref(), Some("Stream error: refused 5"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_retry_resets_backoff() {
        let scripts = (0..5).map(|_| fail("connection refused")).collect();
        let (session, attempts) = start(scripts);

        let state = wait_until(&session, |s| s.generation == 4 && s.phase == Phase::Backoff).await;
        assert_eq!(state.next_retry, Some(Duration::from_secs(8)));

        let requested = Instant::now();
        session.retry_now();

        let state = wait_until(&session, |s| s.generation == 5 && s.phase == Phase::Backoff).await;
        assert_eq!(attempts.lock()[4], requested);
        assert_eq!(state.next_retry, Some(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_retry_replaces_open_stream() {
        let (first, first_script) = stream();
        let (second, second_script) = stream();
        let (session, _) = start(vec![first_script, second_script]);

        first.send(upsert("u-1", "clicks"));
        wait_until(&session, |s| s.resources.len() == 1).await;

        session.retry_now();
        let state = wait_until(&session, |s| s.generation == 2 && s.connected()).await;

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert!(state.resources.is_empty());
        assert_eq!(state.last_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_retries_collapse() {
        let scripts = (0..3).map(|_| fail("connection refused")).collect();
        let (session, attempts) = start(scripts);
        wait_until(&session, |s| s.phase == Phase::Backoff).await;

        session.retry_now();
        session.retry_now();
        session.retry_now();

        wait_until(&session, |s| s.generation == 3).await;
        let attempts = attempts.lock();
        assert_eq!(attempts[1] - attempts[0], Duration::ZERO);
        assert_eq!(attempts[2] - attempts[1], Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_event_keeps_stream_open() {
        let (feed, script) = stream();
        let (session, _) = start(vec![script]);

        feed.send(upsert("u-1", "clicks"));
        feed.send("event: error\ndata: watch expired\n\n");
        feed.send(upsert("u-2", "orders"));

        let state = wait_until(&session, |s| s.resources.len() == 2).await;
        assert!(state.connected());
        assert_eq!(state.generation, 1);
        assert_eq!(state.last_error(), Some("watch expired"));
        assert!(!feed.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_payload_does_not_block_siblings() {
        let (feed, script) = stream();
        let (session, _) = start(vec![script]);

        feed.send(format!("data: {{broken\n\n{}", upsert("u-1", "clicks")));

        let state = wait_until(&session, |s| !s.resources.is_empty()).await;
        assert_eq!(uids(&state), vec!["u-1"]);
        assert!(state.last_error().unwrap().starts_with("Invalid JSON"));
        assert!(state.connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_stream_error_schedules_reconnect() {
        let (feed, script) = stream();
        let (session, _) = start(vec![script]);
        wait_until(&session, |s| s.connected()).await;

        feed.fail("connection reset");

        let state = wait_until(&session, |s| s.phase == Phase::Backoff).await;
        assert!(!state.connected());
        assert_eq!(state.last_error(), Some("Stream error: connection reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_event_without_message() {
        let (feed, script) = stream();
        let (session, _) = start(vec![script]);

        feed.send(upsert("u-1", "clicks"));
        feed.send("event: error\n\n");

        let state = wait_until(&session, |s| s.last_error().is_some()).await;
        assert_eq!(state.last_error(), Some(UNSPECIFIED_SERVER_ERROR));
        assert!(state.connected());
        assert_eq!(uids(&state), vec!["u-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_frame_fails_connection() {
        let (feed, script) = stream();
        let (session, _) = start(vec![script]);
        wait_until(&session, |s| s.connected()).await;

        feed.send(format!("data: {}", "x".repeat(MAX_FRAME_SIZE + 1)));

        let state = wait_until(&session, |s| s.phase == Phase::Backoff).await;
        assert!(!state.connected());
        assert!(state
            .last_error()
            .unwrap()
            .starts_with("Protocol error: Frame too large"));
        assert_eq!(state.next_retry, Some(Duration::from_secs(1)));
        assert!(feed.is_closed());
    }

    #[cfg(feature = "metrics")]
    #[tokio::test(start_paused = true)]
    async fn test_session_metrics() {
        let (feed, script) = stream();
        let metrics = Arc::new(Metrics::new());
        let transport = ScriptedTransport::new(vec![script, fail("connection refused")]);
        let session =
            WatchSession::start_with_metrics(transport, &WatchConfig::default(), metrics.clone());

        feed.send(upsert("u-1", "clicks"));
        wait_until(&session, |s| !s.resources.is_empty()).await;
        feed.close();
        wait_until(&session, |s| s.generation == 2 && s.phase == Phase::Backoff).await;

        let exported = metrics.export();
        for line in [
            "flinkwatch_connection_attempts_total 2",
            "flinkwatch_connections_established_total 1",
            "flinkwatch_disconnects_total{reason=\"closed\"} 1",
            "flinkwatch_disconnects_total{reason=\"error\"} 1",
            "flinkwatch_events_applied_total{kind=\"upserted\"} 1",
            "flinkwatch_frames_total 1",
            "flinkwatch_connected 0",
            "flinkwatch_resources 1",
        ] {
            assert!(exported.contains(line), "missing {:?} in:\n{}", line, exported);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_close_is_not_an_error() {
        let (feed, script) = stream();
        let (session, _) = start(vec![script]);

        feed.send(format!("retry: 5000\n{}", upsert("u-1", "clicks")));
        wait_until(&session, |s| !s.resources.is_empty()).await;
        feed.close();

        let state = wait_until(&session, |s| s.phase == Phase::Backoff).await;
        assert_eq!(state.last_error(), None);
        assert_eq!(state.server_retry_hint, Some(Duration::from_secs(5)));
        assert_eq!(state.next_retry, Some(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_phases_published_in_order() {
        let (feed, script) = stream();
        let phases = Arc::new(Mutex::new(Vec::new()));
        let seen = phases.clone();

        let transport = ScriptedTransport::new(vec![script]);
        let session = WatchSession::start(transport, &WatchConfig::default());
        let _subscription = session.subscribe(move |s| seen.lock().push(s.phase));

        wait_until(&session, |s| s.connected()).await;
        feed.close();
        wait_until(&session, |s| s.phase == Phase::Backoff).await;
        session.shutdown().await;

        let phases = phases.lock();
        assert_eq!(phases.first(), Some(&Phase::Connecting));
        assert_eq!(phases.last(), Some(&Phase::Stopped));
        assert!(phases.contains(&Phase::Streaming));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_all_work() {
        let (feed, script) = stream();
        let (session, attempts) = start(vec![script]);
        let last = Arc::new(Mutex::new(None));
        let seen = last.clone();
        let _subscription = session.subscribe(move |s| *seen.lock() = Some(s.clone()));
        wait_until(&session, |s| s.connected()).await;

        session.shutdown().await;
        assert!(feed.is_closed());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(attempts.lock().len(), 1);

        let last = last.lock().clone().unwrap();
        assert_eq!(last.phase, Phase::Stopped);
        assert!(!last.connected());
        assert_eq!(last.last_error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_stream() {
        let (feed, script) = stream();
        let (session, attempts) = start(vec![script]);
        wait_until(&session, |s| s.connected()).await;

        drop(session);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(feed.is_closed());
        assert_eq!(attempts.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_backoff() {
        let (session, attempts) = start(vec![fail("connection refused")]);
        wait_until(&session, |s| s.phase == Phase::Backoff).await;

        session.shutdown().await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(attempts.lock().len(), 1);
    }
}
