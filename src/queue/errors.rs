//! Error types for the inbound frame queue.

use thiserror::Error;

/// Errors returned when pushing an outer frame onto the inbound queue.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue was at capacity and the policy was `ReturnErrorIfFull`.
    #[error("inbound queue full")]
    Full,
    /// The consuming end of the queue has been dropped or closed.
    #[error("inbound queue closed")]
    Closed,
}
