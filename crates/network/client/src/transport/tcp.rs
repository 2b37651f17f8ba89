//! TCP transport: one persistent stream to the game server.
//!
//! - `connect` is bounded by `connect_timeout` and always sends the login
//!   frame first.
//! - Exactly one read loop per connection; frames are dispatched from there.
//! - Writes go through an async mutex so header and payload of one frame are
//!   never interleaved with another frame. A write is bounded by
//!   `write_timeout` and abandoned as soon as `disconnect` starts.
//! - There is no automatic reconnect. When the connection drops the state
//!   goes to `Disconnected` and stays there until the caller connects again.

use std::{
    fmt,
    sync::{
        Arc, Mutex as StdMutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use bytes::Bytes;
use network_shared::{
    ClientNetworkingConfig, ConnectionState, Credentials, DisconnectReason, FrameCodec,
    JsonSerializer, MessageId, MessageSerializer, ServerEndpoint,
};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpStream, tcp::OwnedWriteHalf},
    sync::{Mutex, oneshot, watch},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, error, info, trace, warn};

use super::{
    MessageSink,
    read_loop::{FrameReader, ReadLoopExit},
};
use crate::{
    dispatch::Dispatcher,
    error::{ConnectError, SendError},
    metrics::{TransportMetrics, TransportMetricsSnapshot},
};

struct Shared {
    state: watch::Sender<ConnectionState>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    /// Number of teardowns waiting for the writer; in-flight writes give up while > 0.
    closing: watch::Sender<usize>,
    /// Bumped on every connect; a read loop only tears down "its" connection.
    generation: AtomicU64,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<TransportMetrics>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) -> ConnectionState {
        self.state.send_replace(state)
    }

    fn mark_disconnected(&self, reason: DisconnectReason) {
        let previous = self.set_state(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            self.metrics.record_disconnect();
            info!(target: "network::transport", ?reason, "disconnected");
        }
    }

    async fn on_read_loop_exit(&self, generation: u64, exit: ReadLoopExit) {
        let reason = match &exit {
            ReadLoopExit::Shutdown => {
                debug!(target: "network::transport", generation, "read loop stopped");
                return;
            }
            ReadLoopExit::RemoteClosed => {
                info!(target: "network::transport", "server closed the connection");
                DisconnectReason::RemoteClosed
            }
            ReadLoopExit::ReadError(err) => {
                warn!(target: "network::transport", error = %err, "read failed");
                DisconnectReason::TransportError
            }
            ReadLoopExit::ProtocolViolation(err) => {
                error!(target: "network::transport", error = %err, "protocol violation, dropping connection");
                DisconnectReason::ProtocolViolation
            }
        };

        let mut writer = self.writer.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        if let Some(mut half) = writer.take() {
            let _ = half.shutdown().await;
        }
        drop(writer);
        self.mark_disconnected(reason);
    }
}

/// Holds `closing` raised for as long as a teardown is in progress, also when
/// the teardown future is dropped half way.
struct ClosingGuard<'a>(&'a watch::Sender<usize>);

impl<'a> ClosingGuard<'a> {
    fn raise(closing: &'a watch::Sender<usize>) -> Self {
        closing.send_modify(|closers| *closers += 1);
        Self(closing)
    }
}

impl Drop for ClosingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|closers| *closers = closers.saturating_sub(1));
    }
}

struct ReadLoopHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Client side of the game protocol over a single TCP stream.
pub struct TcpClientTransport<S = JsonSerializer> {
    shared: Arc<Shared>,
    read_loop: StdMutex<Option<ReadLoopHandle>>,
    frame_codec: FrameCodec,
    codec: S,
    config: ClientNetworkingConfig,
}

impl TcpClientTransport<JsonSerializer> {
    pub fn new(config: ClientNetworkingConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self::with_codec(config, dispatcher, JsonSerializer)
    }
}

impl<S> TcpClientTransport<S>
where
    S: MessageSerializer + Clone,
{
    pub fn with_codec(config: ClientNetworkingConfig, dispatcher: Arc<Dispatcher>, codec: S) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                state,
                writer: Mutex::new(None),
                closing: watch::channel(0).0,
                generation: AtomicU64::new(0),
                dispatcher,
                metrics: Arc::default(),
            }),
            read_loop: StdMutex::new(None),
            frame_codec: FrameCodec::new(config.max_frame_size),
            codec,
            config,
        }
    }

    /// Opens a new connection and logs in. Any existing connection is closed first.
    pub async fn connect(&self, endpoint: &ServerEndpoint, credentials: &Credentials) -> Result<(), ConnectError> {
        self.disconnect().await;

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.set_state(ConnectionState::Connecting);
        debug!(target: "network::transport", %endpoint, generation, "connecting");

        let after = self.config.connect_timeout();
        let stream = match timeout(after, TcpStream::connect((endpoint.host.as_str(), endpoint.port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                self.shared.set_state(ConnectionState::Disconnected);
                warn!(target: "network::transport", %endpoint, error = %source, "connect failed");
                return Err(ConnectError::Unreachable {
                    endpoint: endpoint.clone(),
                    source,
                });
            }
            Err(_) => {
                self.shared.set_state(ConnectionState::Disconnected);
                warn!(target: "network::transport", %endpoint, ?after, "connect timed out");
                return Err(ConnectError::Timeout {
                    endpoint: endpoint.clone(),
                    after,
                });
            }
        };
        if let Err(err) = stream.set_nodelay(true) {
            debug!(target: "network::transport", error = %err, "set_nodelay failed");
        }

        let (read_half, write_half) = stream.into_split();
        *self.shared.writer.lock().await = Some(write_half);
        self.shared.set_state(ConnectionState::Connected);
        self.shared.metrics.record_connect();

        let reader = FrameReader::new(
            read_half,
            Arc::clone(&self.shared.dispatcher),
            Arc::clone(&self.shared.metrics),
            self.config.max_frame_size,
            self.config.read_buffer_size,
        );
        let (shutdown, shutdown_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let exit = reader.run(shutdown_rx).await;
            shared.on_read_loop_exit(generation, exit).await;
        });
        *self.read_loop.lock().unwrap_or_else(PoisonError::into_inner) = Some(ReadLoopHandle { shutdown, task });
        info!(target: "network::transport", %endpoint, "connected");

        if let Err(err) = self.send_message(MessageId::Login, credentials).await {
            warn!(target: "network::transport", error = %err, "login request failed");
            self.disconnect().await;
            return Err(ConnectError::Login(err));
        }
        debug!(target: "network::transport", username = %credentials.username, "login request sent");
        Ok(())
    }

    /// Stops the read loop and closes the socket. Never fails; a no-op when
    /// already disconnected.
    pub async fn disconnect(&self) {
        // Raised before anything else so a write stuck on a peer that stopped
        // reading releases the writer lock.
        let _closing = ClosingGuard::raise(&self.shared.closing);
        let handle = self.read_loop.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            let _ = handle.shutdown.send(());
            if let Err(err) = handle.task.await {
                if err.is_panic() {
                    error!(target: "network::transport", "read loop panicked");
                }
            }
        }
        if let Some(mut half) = self.shared.writer.lock().await.take() {
            let _ = half.shutdown().await;
        }
        self.shared.mark_disconnected(DisconnectReason::Graceful);
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.shared.dispatcher
    }

    pub fn metrics(&self) -> TransportMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn config(&self) -> &ClientNetworkingConfig {
        &self.config
    }

    fn stop_read_loop(&self) {
        let handle = self.read_loop.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            let _ = handle.shutdown.send(());
        }
    }
}

impl<S> MessageSink for TcpClientTransport<S>
where
    S: MessageSerializer + Clone,
{
    type Codec = S;

    fn codec(&self) -> &S {
        &self.codec
    }

    async fn send(&self, message_id: i32, payload: Bytes) -> Result<(), SendError> {
        let mut closing = self.shared.closing.subscribe();
        let mut writer = self.shared.writer.lock().await;
        let Some(half) = writer.as_mut() else {
            return Err(SendError::NotConnected);
        };
        let frame = self.frame_codec.encode_to_bytes(message_id, &payload)?;

        let write_timeout = self.config.write_timeout();
        let outcome = tokio::select! {
            written = timeout(write_timeout, half.write_all(&frame)) => match written {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(SendError::Io(err)),
                Err(_) => Err(SendError::Timeout(write_timeout)),
            },
            _ = closing.wait_for(|closers| *closers > 0) => Err(SendError::Aborted),
        };

        match outcome {
            Ok(()) => {
                self.shared.metrics.record_sent(frame.len());
                trace!(target: "network::transport", message_id, payload_len = payload.len(), "frame sent");
                Ok(())
            }
            Err(SendError::Aborted) => {
                // Half a frame may be on the wire; the stream is unusable.
                writer.take();
                debug!(target: "network::transport", message_id, "write abandoned, connection closing");
                Err(SendError::Aborted)
            }
            Err(err) => {
                writer.take();
                drop(writer);
                warn!(target: "network::transport", message_id, error = %err, "write failed");
                self.stop_read_loop();
                self.shared.mark_disconnected(DisconnectReason::TransportError);
                Err(err)
            }
        }
    }
}

impl<S> Drop for TcpClientTransport<S> {
    fn drop(&mut self) {
        let slot = self.read_loop.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.task.abort();
        }
    }
}

impl<S> fmt::Debug for TcpClientTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpClientTransport")
            .field("state", &*self.shared.state.borrow())
            .field("generation", &self.shared.generation.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish()
    }
}
