//! Relay Listener: durable consumer for an append-only relay firehose.
//!
//! The listener holds one persistent WebSocket connection to an upstream
//! relay, decodes each binary frame into a `(Header, Body)` message, runs an
//! external filter predicate, forwards accepted messages to a downstream
//! queue, and persists the last-seen sequence number so a restart resumes
//! roughly where it left off.
//!
//! # Core Invariants
//!
//! 1. **One In-Flight**: at most one frame's pipeline run at a time;
//!    reconnects never interleave with an in-flight frame
//! 2. **Validate-Before-Effect**: no forward and no cursor write for a frame
//!    that fails decode or validation
//! 3. **Cursor-Per-Frame**: the cursor advances for every decoded and
//!    validated frame, accepted or not
//! 4. **At-Least-Once**: forward happens before the cursor write; a crash
//!    between the two may duplicate downstream delivery
//!
//! # Architecture
//!
//! ```text
//! Relay (WebSocket) -> decode -> validate -> filter -> forward -> cursor
//!        ^                                               |          |
//!        |                                          Queue sink   KV store
//!     ping() watchdog
//! ```

pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod listener;
pub mod pipeline;
pub mod sink;

#[cfg(test)]
mod tests;

pub use codec::{decode_frame, RelayBody, RelayHeader, RelayMessage};
pub use config::ListenerConfig;
pub use cursor::{CursorRecorder, CursorStore, FileCursorStore, DEFAULT_CURSOR_KEY};
pub use error::{ListenerError, ListenerResult};
pub use filter::{FilterGateway, MessageFilter, TagFilter};
pub use listener::{ConnectionState, RelayListener};
pub use pipeline::Pipeline;
pub use sink::{ContentType, Forwarder, QueueSink, RedisStreamSink};
