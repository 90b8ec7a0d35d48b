//! Error types for the relay listener.

use thiserror::Error;

/// Listener error type.
///
/// Every per-frame variant is fatal for that frame only; none are silently
/// recovered inside the pipeline.
#[derive(Error, Debug)]
pub enum ListenerError {
    /// WebSocket connection or protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error (socket, file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A text frame arrived where binary was required
    #[error("expected a binary frame, got a text frame")]
    UnexpectedFrameType,

    /// The frame payload is not well-formed CBOR
    #[error("frame decode error: {0}")]
    Decode(String),

    /// Decoded data does not match the required message shape
    #[error("message validation error: {0}")]
    Validation(String),

    /// The filter predicate itself failed
    #[error("filter predicate error: {0}")]
    Filter(String),

    /// The queue sink rejected or failed the send
    #[error("queue forward error: {0}")]
    Forward(String),

    /// Cursor persistence failed
    #[error("cursor storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for listener operations.
pub type ListenerResult<T> = Result<T, ListenerError>;
