//! Connection manager for the upstream relay.
//!
//! Owns the single WebSocket to the relay, runs every inbound frame through
//! the pipeline under a per-frame mutual-exclusion guard, and exposes the
//! `ping` health check that lazily (re)establishes the connection.

use crate::config::ListenerConfig;
use crate::cursor::CursorStore;
use crate::error::{ListenerError, ListenerResult};
use crate::filter::MessageFilter;
use crate::pipeline::Pipeline;
use crate::sink::QueueSink;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
}

/// The relay listener.
///
/// One instance owns one socket; the socket handle is never shared. Frame
/// processing and reconnection both go through `frame_lock`, so at most one
/// pipeline run is in flight and a reconnect never interleaves with it.
pub struct RelayListener {
    config: ListenerConfig,
    pipeline: Arc<Pipeline>,
    state: Arc<RwLock<ConnectionState>>,
    frame_lock: Arc<Mutex<()>>,
    connect_lock: Mutex<()>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
    // Incremented per establish; a reader only records the disconnect for
    // the connection it was spawned for.
    generation: Arc<AtomicU64>,
}

impl RelayListener {
    /// Create a new listener wired to its three external collaborators.
    pub fn new(
        config: ListenerConfig,
        filter: Arc<dyn MessageFilter>,
        sink: Arc<dyn QueueSink>,
        store: Arc<dyn CursorStore>,
    ) -> Self {
        let pipeline = Arc::new(Pipeline::new(filter, sink, store, &config.cursor_key));

        Self {
            config,
            pipeline,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            frame_lock: Arc::new(Mutex::new(())),
            connect_lock: Mutex::new(()),
            reader_handle: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Get the current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Health check: a no-op while the socket is open, otherwise exactly one
    /// establish attempt. Safe to call repeatedly and concurrently.
    pub async fn ping(&self) -> ListenerResult<()> {
        let _connect_guard = self.connect_lock.lock().await;

        if *self.state.read().await == ConnectionState::Open {
            debug!("Relay socket open, nothing to do");
            return Ok(());
        }

        self.establish().await
    }

    /// Watchdog loop: periodically invokes the health check. The first tick
    /// fires immediately, so this also performs the initial connect.
    pub async fn run(&self) -> ListenerResult<()> {
        info!(
            interval_secs = self.config.watchdog_interval.as_secs(),
            "Starting relay watchdog"
        );

        let mut interval = tokio::time::interval(self.config.watchdog_interval);
        loop {
            interval.tick().await;
            if let Err(e) = self.ping().await {
                error!(error = %e, "Health check failed to establish the relay connection");
            }
        }
    }

    /// Tear the connection down and stop processing. Used on shutdown.
    pub async fn disconnect(&self) {
        let _connect_guard = self.connect_lock.lock().await;
        self.generation.fetch_add(1, AtomicOrdering::SeqCst);

        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }
        *self.state.write().await = ConnectionState::Disconnected;
        info!("Disconnected from relay");
    }

    /// Open the socket and spawn the reader task. Caller holds the connect
    /// lock.
    async fn establish(&self) -> ListenerResult<()> {
        // Exclude any in-flight frame before touching the connection.
        let _frame_guard = self.frame_lock.lock().await;

        let generation = self.generation.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        if let Some(old) = self.reader_handle.lock().await.take() {
            old.abort();
        }

        *self.state.write().await = ConnectionState::Connecting;

        let cursor = match self.pipeline.cursor().load().await {
            Ok(Some(seq)) => seq,
            Ok(None) => self.config.default_cursor,
            Err(e) => {
                error!(error = %e, "Failed to read stored cursor, using the configured default");
                self.config.default_cursor
            }
        };

        let url = self.config.endpoint(cursor);
        info!(url = %url, cursor, "Connecting to relay");

        let (ws_stream, _) = match connect_async(url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(e.into());
            }
        };

        let (write, read) = ws_stream.split();
        *self.state.write().await = ConnectionState::Open;
        info!("Connected to relay");

        let state = self.state.clone();
        let pipeline = self.pipeline.clone();
        let frame_lock = self.frame_lock.clone();
        let current_generation = self.generation.clone();

        let handle = tokio::spawn(async move {
            Self::read_loop(read, write, pipeline, frame_lock).await;

            // A newer connection may already own the state.
            if current_generation.load(AtomicOrdering::SeqCst) == generation {
                *state.write().await = ConnectionState::Disconnected;
                info!("Relay connection closed");
            }
        });

        *self.reader_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Reader loop: every inbound frame runs the pipeline while holding the
    /// frame lock for the whole sequence. A per-frame failure is surfaced
    /// and aborts only that frame; the connection stays up and the next
    /// frame is unaffected.
    async fn read_loop(
        mut read: SplitStream<WsStream>,
        mut write: SplitSink<WsStream, Message>,
        pipeline: Arc<Pipeline>,
        frame_lock: Arc<Mutex<()>>,
    ) {
        while let Some(next) = read.next().await {
            match next {
                Ok(Message::Binary(data)) => {
                    let _frame_guard = frame_lock.lock().await;
                    if let Err(e) = pipeline.process_frame(&data).await {
                        error!(error = %e, frame_len = data.len(), "Frame processing failed");
                    }
                }
                Ok(Message::Text(_)) => {
                    let _frame_guard = frame_lock.lock().await;
                    error!(
                        error = %ListenerError::UnexpectedFrameType,
                        "Frame processing failed"
                    );
                }
                Ok(Message::Ping(data)) => {
                    let _ = write.send(Message::Pong(data)).await;
                }
                Ok(Message::Close(frame)) => {
                    info!(?frame, "Relay sent close frame");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "WebSocket read error");
                    break;
                }
            }
        }
    }
}
