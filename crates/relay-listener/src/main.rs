//! Relay listener binary entry point.
//!
//! Connects to the upstream relay firehose, forwards filtered events to a
//! Redis Stream, and persists the resume cursor to a local file store.

use clap::Parser;
use relay_listener::{
    FileCursorStore, ListenerConfig, ListenerResult, RedisStreamSink, RelayListener, TagFilter,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Durable relay firehose consumer.
#[derive(Parser, Debug)]
#[command(name = "relay-listener")]
#[command(about = "Consume a relay firehose, filter events, forward them to a queue")]
struct Args {
    /// Upstream relay WebSocket URL (without the cursor parameter).
    #[arg(
        long,
        env = "RELAY_URL",
        default_value = "wss://bsky.network/xrpc/com.atproto.sync.subscribeRepos"
    )]
    relay_url: String,

    /// Redis connection URL for the queue sink.
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Redis stream key to forward accepted messages to.
    #[arg(long, env = "LISTENER_QUEUE_STREAM", default_value = "firehose:events")]
    queue_stream: String,

    /// Directory for the cursor file store.
    #[arg(long, env = "LISTENER_CURSOR_DIR")]
    cursor_dir: Option<PathBuf>,

    /// Resume cursor used when no cursor has been persisted yet.
    #[arg(long, env = "RELAY_DEFAULT_CURSOR", default_value = "0")]
    default_cursor: u64,

    /// Seconds between watchdog health checks.
    #[arg(long, env = "LISTENER_WATCHDOG_SECS", default_value = "30")]
    watchdog_secs: u64,

    /// Header type tags the filter accepts (repeatable).
    #[arg(long = "accept-tag", default_value = "#commit")]
    accept_tags: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ListenerResult<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    info!("Relay listener starting...");

    let mut config = ListenerConfig::new(args.relay_url);
    config.redis_url = args.redis_url;
    config.queue_stream = args.queue_stream;
    config.default_cursor = args.default_cursor;
    config.watchdog_interval = std::time::Duration::from_secs(args.watchdog_secs);
    if let Some(cursor_dir) = args.cursor_dir {
        config.cursor_dir = cursor_dir;
    }

    info!(
        relay_url = %config.relay_url,
        redis_url = %config.redis_url,
        queue_stream = %config.queue_stream,
        cursor_dir = %config.cursor_dir.display(),
        watchdog_secs = config.watchdog_interval.as_secs(),
        "Configuration loaded"
    );

    let store = Arc::new(FileCursorStore::new(config.cursor_dir.clone()).await?);
    let sink = Arc::new(RedisStreamSink::connect(&config.redis_url, &config.queue_stream).await?);
    let filter = Arc::new(TagFilter::new(args.accept_tags));

    let listener = RelayListener::new(config, filter, sink, store);

    let ctrl_c = tokio::signal::ctrl_c();

    tokio::select! {
        result = listener.run() => {
            if let Err(e) = result {
                error!(error = %e, "Listener exited with error");
                return Err(e);
            }
        }
        _ = ctrl_c => {
            info!("Received shutdown signal, exiting...");
            listener.disconnect().await;
        }
    }

    Ok(())
}
