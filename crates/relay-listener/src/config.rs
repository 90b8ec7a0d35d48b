//! Configuration for the relay listener.

use std::path::PathBuf;
use std::time::Duration;

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Upstream relay WebSocket URL, without the cursor query parameter.
    pub relay_url: String,

    /// Resume cursor used when the cursor store is empty.
    pub default_cursor: u64,

    /// Storage key for the cursor.
    pub cursor_key: String,

    /// Directory backing the file cursor store.
    pub cursor_dir: PathBuf,

    /// Redis connection URL for the queue sink.
    pub redis_url: String,

    /// Redis stream key the forwarder appends to.
    pub queue_stream: String,

    /// Interval between watchdog health checks.
    pub watchdog_interval: Duration,
}

impl ListenerConfig {
    /// Create a new ListenerConfig for the given relay URL.
    ///
    /// Uses default values for other settings, which can be overridden via
    /// environment variables.
    pub fn new(relay_url: String) -> Self {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let queue_stream = std::env::var("LISTENER_QUEUE_STREAM")
            .unwrap_or_else(|_| "firehose:events".to_string());

        let cursor_dir = std::env::var("LISTENER_CURSOR_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_cursor_dir());

        let watchdog_secs: u64 = std::env::var("LISTENER_WATCHDOG_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let default_cursor: u64 = std::env::var("RELAY_DEFAULT_CURSOR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Self {
            relay_url,
            default_cursor,
            cursor_key: crate::cursor::DEFAULT_CURSOR_KEY.to_string(),
            cursor_dir,
            redis_url,
            queue_stream,
            watchdog_interval: Duration::from_secs(watchdog_secs),
        }
    }

    /// The subscribe URL for a given resume cursor.
    pub fn endpoint(&self, cursor: u64) -> String {
        format!("{}?cursor={}", self.relay_url, cursor)
    }
}

fn default_cursor_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("relay-listener")
}
