//! Filter gateway.
//!
//! The filter predicate is an external collaborator: a pure function over a
//! decoded message. The gateway invokes it and interprets the boolean, but
//! never suppresses a predicate failure.

use crate::codec::RelayMessage;
use crate::error::{ListenerError, ListenerResult};
use std::sync::Arc;

/// The external filter predicate seam.
///
/// Implementations must be pure with respect to the pipeline: no forwarding
/// or storage side effects of their own. A returned error is fatal for the
/// current frame's processing.
pub trait MessageFilter: Send + Sync {
    fn accept(&self, message: &RelayMessage) -> anyhow::Result<bool>;
}

impl<F> MessageFilter for F
where
    F: Fn(&RelayMessage) -> bool + Send + Sync,
{
    fn accept(&self, message: &RelayMessage) -> anyhow::Result<bool> {
        Ok(self(message))
    }
}

/// Accepts messages whose header type tag is in a fixed set.
///
/// Stands in for the external predicate when running the shipped binary.
#[derive(Debug, Clone)]
pub struct TagFilter {
    tags: Vec<String>,
}

impl TagFilter {
    pub fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }
}

impl MessageFilter for TagFilter {
    fn accept(&self, message: &RelayMessage) -> anyhow::Result<bool> {
        Ok(self.tags.iter().any(|t| t == &message.header.t))
    }
}

/// Invokes the external predicate and maps its failure into the listener's
/// error taxonomy.
pub struct FilterGateway {
    filter: Arc<dyn MessageFilter>,
}

impl FilterGateway {
    pub fn new(filter: Arc<dyn MessageFilter>) -> Self {
        Self { filter }
    }

    /// Run the predicate. A predicate failure propagates as
    /// [`ListenerError::Filter`] and aborts the current frame.
    pub fn accept(&self, message: &RelayMessage) -> ListenerResult<bool> {
        self.filter
            .accept(message)
            .map_err(|e| ListenerError::Filter(format!("{e:#}")))
    }
}
