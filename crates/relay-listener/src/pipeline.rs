//! Per-frame processing sequence.
//!
//! decode -> validate -> filter -> (if accepted) forward -> persist cursor.
//!
//! The cursor advances for every successfully decoded and validated frame,
//! regardless of the filter outcome. It never advances when decode,
//! validation, the predicate, or the forward fail. Forward happens before
//! the cursor write, so a crash between the two can duplicate a downstream
//! delivery; deduplication is the downstream consumer's concern.

use crate::codec::{decode_frame, RelayMessage};
use crate::cursor::{CursorRecorder, CursorStore};
use crate::error::ListenerResult;
use crate::filter::{FilterGateway, MessageFilter};
use crate::sink::{Forwarder, QueueSink};
use std::sync::Arc;
use tracing::debug;

/// The decode/filter/forward/persist sequence for one frame.
pub struct Pipeline {
    gateway: FilterGateway,
    forwarder: Forwarder,
    cursor: CursorRecorder,
}

impl Pipeline {
    pub fn new(
        filter: Arc<dyn MessageFilter>,
        sink: Arc<dyn QueueSink>,
        store: Arc<dyn CursorStore>,
        cursor_key: &str,
    ) -> Self {
        Self {
            gateway: FilterGateway::new(filter),
            forwarder: Forwarder::new(sink),
            cursor: CursorRecorder::new(store, cursor_key),
        }
    }

    /// Run one binary frame through the full sequence.
    ///
    /// Any error aborts this frame with no further side effects; the caller
    /// surfaces it and moves on to the next frame.
    pub async fn process_frame(&self, raw: &[u8]) -> ListenerResult<RelayMessage> {
        let message = decode_frame(raw)?;

        let accepted = self.gateway.accept(&message)?;
        if accepted {
            self.forwarder.forward(&message).await?;
        }

        self.cursor.save(message.body.seq).await?;

        debug!(
            seq = message.body.seq,
            t = %message.header.t,
            op = message.header.op,
            accepted,
            "Processed frame"
        );

        Ok(message)
    }

    /// The cursor recorder, used by the connection manager to resolve the
    /// resume cursor at (re)establish time.
    pub fn cursor(&self) -> &CursorRecorder {
        &self.cursor
    }
}
