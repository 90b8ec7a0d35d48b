//! Forwarder and queue sink.
//!
//! The downstream queue is an external collaborator with durable
//! enqueue-before-acknowledge semantics. The forwarder serializes the full
//! decoded message and hands it over with a declared content encoding; it
//! performs no retries of its own.

use crate::codec::RelayMessage;
use crate::error::{ListenerError, ListenerResult};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;
use std::sync::Arc;
use tracing::debug;

/// Content encoding declared to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
        }
    }
}

/// The downstream queue seam.
///
/// Implementations must durably enqueue before returning `Ok`; a returned
/// error is fatal for the current frame and the cursor is not advanced.
#[async_trait]
pub trait QueueSink: Send + Sync {
    async fn send(&self, payload: &[u8], content_type: ContentType) -> anyhow::Result<()>;
}

/// Serializes accepted messages and hands them to the queue sink.
pub struct Forwarder {
    sink: Arc<dyn QueueSink>,
}

impl Forwarder {
    pub fn new(sink: Arc<dyn QueueSink>) -> Self {
        Self { sink }
    }

    /// Forward one message. A failed send propagates as
    /// [`ListenerError::Forward`] before any cursor write.
    pub async fn forward(&self, message: &RelayMessage) -> ListenerResult<()> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| ListenerError::Forward(format!("serialize: {e}")))?;

        self.sink
            .send(&payload, ContentType::Json)
            .await
            .map_err(|e| ListenerError::Forward(format!("{e:#}")))?;

        debug!(
            seq = message.body.seq,
            t = %message.header.t,
            payload_len = payload.len(),
            "Forwarded message to queue"
        );

        Ok(())
    }
}

/// Redis Streams sink: one `XADD` per accepted message.
pub struct RedisStreamSink {
    conn: MultiplexedConnection,
    stream_key: String,
}

impl RedisStreamSink {
    /// Connect to Redis and bind the sink to a stream key.
    pub async fn connect(redis_url: &str, stream_key: &str) -> ListenerResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        Ok(Self {
            conn,
            stream_key: stream_key.to_string(),
        })
    }
}

#[async_trait]
impl QueueSink for RedisStreamSink {
    async fn send(&self, payload: &[u8], content_type: ContentType) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();

        // XADD key * field value [field value ...]
        let entry_id: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("content_type")
            .arg(content_type.as_str())
            .arg("payload")
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        debug!(
            stream = %self.stream_key,
            entry_id = %entry_id,
            payload_len = payload.len(),
            "Enqueued message"
        );

        Ok(())
    }
}
