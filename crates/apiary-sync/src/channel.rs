//! Live node push channel
//!
//! One owned channel per session, driven by a three-state machine:
//! `Disconnected -> Connecting -> Connected`, falling back to
//! `Disconnected` on any error or close, then retrying after a fixed
//! delay, forever, until the session shuts the channel down.
//!
//! `connect()` is an idempotent guard: while a channel task is live it
//! is a no-op, so callers can invoke it opportunistically (every full
//! node refresh does) without ever producing a second channel.

use crate::fleet::FleetState;
use crate::message::PushMessage;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Connection machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Channel-level failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelError {
    /// The channel could not be opened
    #[error("connect failed: {0}")]
    Connect(String),

    /// The live channel broke
    #[error("channel closed: {0}")]
    Closed(String),

    /// One frame could not be decoded; the channel itself survives
    #[error("malformed frame: {0}")]
    Decode(String),
}

/// Inbound message stream of one opened channel
pub type MessageStream = BoxStream<'static, Result<PushMessage, ChannelError>>;

/// Opens push channels; the seam that keeps the reconnect machine
/// testable without a network
#[async_trait]
pub trait ChannelTransport: Send + Sync + 'static {
    /// Open a channel and return its inbound stream.
    ///
    /// # Errors
    /// - `ChannelError::Connect` when the channel cannot be established
    async fn open(&self, url: &str) -> Result<MessageStream, ChannelError>;
}

/// WebSocket transport
#[derive(Debug, Default)]
pub struct WsTransport;

impl WsTransport {
    /// New transport
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelTransport for WsTransport {
    async fn open(&self, url: &str) -> Result<MessageStream, ChannelError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        let (mut sink, mut stream) = ws.split();
        let (tx, rx) = mpsc::channel::<Result<PushMessage, ChannelError>>(64);

        // Reader task: decodes frames, answers pings, forwards into the
        // stream handed to the connection machine. Ends when the peer
        // closes or the consumer drops the stream.
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                let forward = match item {
                    Ok(Message::Text(raw)) => serde_json::from_str::<PushMessage>(&raw)
                        .map_err(|err| ChannelError::Decode(err.to_string())),
                    Ok(Message::Binary(raw)) => serde_json::from_slice::<PushMessage>(&raw)
                        .map_err(|err| ChannelError::Decode(err.to_string())),
                    Ok(Message::Ping(payload)) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(Message::Pong(_) | Message::Frame(_)) => continue,
                    Ok(Message::Close(_)) => break,
                    Err(err) => {
                        let _ = tx.send(Err(ChannelError::Closed(err.to_string()))).await;
                        break;
                    }
                };
                if tx.send(forward).await.is_err() {
                    break;
                }
            }
        });

        Ok(receiver_stream(rx))
    }
}

fn receiver_stream(rx: mpsc::Receiver<Result<PushMessage, ChannelError>>) -> MessageStream {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
    .boxed()
}

/// The reconnecting push-channel client
pub struct LiveNodeSync {
    url: String,
    reconnect_delay: Duration,
    transport: Arc<dyn ChannelTransport>,
    fleet: Arc<FleetState>,
    alerts: mpsc::UnboundedSender<String>,
    state: Arc<Mutex<ConnectionState>>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl LiveNodeSync {
    /// Client over the given transport, merging into `fleet` and
    /// routing alerts into `alerts`
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        reconnect_delay: Duration,
        transport: Arc<dyn ChannelTransport>,
        fleet: Arc<FleetState>,
        alerts: mpsc::UnboundedSender<String>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            url: url.into(),
            reconnect_delay,
            transport,
            fleet,
            alerts,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            task: Mutex::new(None),
            shutdown,
        }
    }

    /// Current machine state
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Start the channel if it is not already live.
    ///
    /// At most one channel task exists at a time; a call while the
    /// task is live (in any state, including the between-retries
    /// delay) is a no-op.
    pub fn connect(&self) {
        if *self.shutdown.borrow() {
            return;
        }
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::trace!("push channel already live, connect is a no-op");
            return;
        }
        *self.state.lock() = ConnectionState::Connecting;
        let worker = Worker {
            url: self.url.clone(),
            reconnect_delay: self.reconnect_delay,
            transport: Arc::clone(&self.transport),
            fleet: Arc::clone(&self.fleet),
            alerts: self.alerts.clone(),
            state: Arc::clone(&self.state),
            shutdown: self.shutdown.subscribe(),
        };
        *task = Some(tokio::spawn(worker.run()));
    }

    /// Stop the channel for good; the machine ends `Disconnected`.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        *self.state.lock() = ConnectionState::Disconnected;
    }
}

impl std::fmt::Debug for LiveNodeSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveNodeSync")
            .field("url", &self.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct Worker {
    url: String,
    reconnect_delay: Duration,
    transport: Arc<dyn ChannelTransport>,
    fleet: Arc<FleetState>,
    alerts: mpsc::UnboundedSender<String>,
    state: Arc<Mutex<ConnectionState>>,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    async fn run(self) {
        let Worker {
            url,
            reconnect_delay,
            transport,
            fleet,
            alerts,
            state,
            mut shutdown,
        } = self;

        loop {
            // State is Connecting on every pass of this loop.
            let opened = tokio::select! {
                () = wait_shutdown(&mut shutdown) => break,
                opened = transport.open(&url) => opened,
            };

            match opened {
                Ok(mut stream) => {
                    *state.lock() = ConnectionState::Connected;
                    tracing::info!(%url, "push channel connected");

                    loop {
                        let item = tokio::select! {
                            () = wait_shutdown(&mut shutdown) => {
                                *state.lock() = ConnectionState::Disconnected;
                                return;
                            }
                            item = stream.next() => item,
                        };
                        match item {
                            Some(Ok(PushMessage::Update(delta))) => {
                                fleet.apply(&delta);
                            }
                            Some(Ok(PushMessage::Alert { message })) => {
                                if alerts.send(message).is_err() {
                                    tracing::trace!("alert sink closed");
                                }
                            }
                            Some(Err(ChannelError::Decode(err))) => {
                                tracing::warn!(error = %err, "dropping malformed frame");
                            }
                            Some(Err(err)) => {
                                tracing::warn!(error = %err, "push channel failed");
                                break;
                            }
                            None => {
                                tracing::info!("push channel closed by peer");
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "push channel connect failed");
                }
            }

            *state.lock() = ConnectionState::Disconnected;

            // Constant-interval retry; no exponential backoff.
            tokio::select! {
                () = wait_shutdown(&mut shutdown) => break,
                () = tokio::time::sleep(reconnect_delay) => {}
            }
            *state.lock() = ConnectionState::Connecting;
        }

        *state.lock() = ConnectionState::Disconnected;
    }
}

async fn wait_shutdown(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        // A dropped sender also ends the channel
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiary_core::types::{Node, NodeDelta, NodeStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn node(id: i64, name: &str) -> Node {
        let t = chrono::NaiveDate::from_ymd_opt(2026, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Node {
            id,
            name: name.to_string(),
            ip_address: format!("10.0.0.{id}"),
            port: 2222,
            description: None,
            group: "default".to_string(),
            is_active: true,
            status: NodeStatus::Online,
            cpu_usage: 0.0,
            cpu_usage_detail: None,
            last_seen: None,
            create_time: t,
            update_time: t,
        }
    }

    /// Transport whose every open yields the scripted items and then
    /// stays silent
    struct ScriptedTransport {
        opens: AtomicUsize,
        script: Vec<Result<PushMessage, ChannelError>>,
        hold_open: bool,
    }

    impl ScriptedTransport {
        fn silent() -> Self {
            Self {
                opens: AtomicUsize::new(0),
                script: Vec::new(),
                hold_open: true,
            }
        }

        fn replaying(script: Vec<Result<PushMessage, ChannelError>>, hold_open: bool) -> Self {
            Self {
                opens: AtomicUsize::new(0),
                script,
                hold_open,
            }
        }

        fn open_count(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChannelTransport for ScriptedTransport {
        async fn open(&self, _url: &str) -> Result<MessageStream, ChannelError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let replay = futures::stream::iter(self.script.clone());
            if self.hold_open {
                Ok(replay.chain(futures::stream::pending()).boxed())
            } else {
                Ok(replay.boxed())
            }
        }
    }

    fn sync_over(
        transport: Arc<ScriptedTransport>,
        fleet: Arc<FleetState>,
    ) -> (LiveNodeSync, mpsc::UnboundedReceiver<String>) {
        let (alert_tx, alert_rx) = mpsc::unbounded_channel();
        let sync = LiveNodeSync::new(
            "ws://test/nodes/ws",
            Duration::from_millis(10),
            transport,
            fleet,
            alert_tx,
        );
        (sync, alert_rx)
    }

    #[tokio::test]
    async fn connect_is_idempotent_while_live() {
        let transport = Arc::new(ScriptedTransport::silent());
        let (sync, _alerts) = sync_over(Arc::clone(&transport), Arc::new(FleetState::new()));

        sync.connect();
        sync.connect();
        sync.connect();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(transport.open_count(), 1);
        assert_eq!(sync.state(), ConnectionState::Connected);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn updates_merge_in_arrival_order() {
        let fleet = Arc::new(FleetState::new());
        fleet.replace_all(vec![node(1, "hive-a")]);
        let transport = Arc::new(ScriptedTransport::replaying(
            vec![
                Ok(PushMessage::Update(NodeDelta::new(1).with_cpu_usage(10.0))),
                Ok(PushMessage::Update(NodeDelta::new(1).with_cpu_usage(20.0))),
            ],
            true,
        ));
        let (sync, _alerts) = sync_over(transport, Arc::clone(&fleet));

        sync.connect();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(fleet.get(1).unwrap().cpu_usage, 20.0);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn alerts_route_to_sink_without_touching_nodes() {
        let fleet = Arc::new(FleetState::new());
        fleet.replace_all(vec![node(1, "hive-a")]);
        let transport = Arc::new(ScriptedTransport::replaying(
            vec![Ok(PushMessage::Alert {
                message: "disk pressure on hive-a".to_string(),
            })],
            true,
        ));
        let (sync, mut alerts) = sync_over(transport, Arc::clone(&fleet));

        sync.connect();
        let alert = tokio::time::timeout(Duration::from_millis(200), alerts.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alert, "disk pressure on hive-a");
        assert_eq!(fleet.get(1).unwrap(), node(1, "hive-a"));
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_frame_does_not_break_the_channel() {
        let fleet = Arc::new(FleetState::new());
        fleet.replace_all(vec![node(1, "hive-a")]);
        let transport = Arc::new(ScriptedTransport::replaying(
            vec![
                Err(ChannelError::Decode("not json".to_string())),
                Ok(PushMessage::Update(NodeDelta::new(1).with_cpu_usage(33.0))),
            ],
            true,
        ));
        let (sync, _alerts) = sync_over(Arc::clone(&transport), Arc::clone(&fleet));

        sync.connect();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(fleet.get(1).unwrap().cpu_usage, 33.0);
        assert_eq!(sync.state(), ConnectionState::Connected);
        sync.shutdown().await;
    }

    #[tokio::test]
    async fn closed_channel_reconnects_after_fixed_delay() {
        // Every open closes immediately, so the machine cycles
        // Connecting -> Connected -> Disconnected -> (delay) -> ...
        let transport = Arc::new(ScriptedTransport::replaying(Vec::new(), false));
        let (sync, _alerts) = sync_over(Arc::clone(&transport), Arc::new(FleetState::new()));

        sync.connect();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(transport.open_count() >= 2, "expected repeated reconnects");
        sync.shutdown().await;
        assert_eq!(sync.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn shutdown_is_terminal() {
        let transport = Arc::new(ScriptedTransport::silent());
        let (sync, _alerts) = sync_over(Arc::clone(&transport), Arc::new(FleetState::new()));

        sync.connect();
        tokio::time::sleep(Duration::from_millis(20)).await;
        sync.shutdown().await;
        assert_eq!(sync.state(), ConnectionState::Disconnected);

        // A later opportunistic connect must not revive the channel
        sync.connect();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.open_count(), 1);
        assert_eq!(sync.state(), ConnectionState::Disconnected);
    }
}
