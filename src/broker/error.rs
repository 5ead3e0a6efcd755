//! Broker error types.

use thiserror::Error;

use crate::types::UnknownEventKind;

/// Errors returned by [`BrokerHandle`](super::BrokerHandle) operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    /// The broker task has shut down.
    #[error("event broker is closed")]
    Closed,

    /// A subscription named an event kind outside the vocabulary.
    #[error(transparent)]
    UnknownEventKind(#[from] UnknownEventKind),
}

impl BrokerError {
    /// Returns true if the broker is no longer running.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
