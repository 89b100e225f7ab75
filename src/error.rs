//! Error types surfaced by handlers and the ingest path.
//!
//! Incomplete data and corrupt framing are never errors: the decoder waits or
//! recovers on its own. Only faults a caller can act on are modelled here.

use bincode::error::DecodeError;
use thiserror::Error;

use crate::queue::QueueError;

/// Failure reported by a [`Handler`](crate::dispatch::Handler).
///
/// The dispatcher logs these per sub-message; they never abort sibling
/// sub-messages or the dispatch loop.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The sub-message body could not be decoded into the expected type.
    #[error("failed to decode body for method {method_id:#06x}: {source}")]
    Decode {
        /// Method id of the sub-message.
        method_id: u16,
        /// Underlying decoder error.
        #[source]
        source: DecodeError,
    },
    /// The body decoded but its contents were unacceptable.
    #[error("method {method_id:#06x} rejected: {reason}")]
    Rejected {
        /// Method id of the sub-message.
        method_id: u16,
        /// Human-readable reason.
        reason: String,
    },
    /// Any other handler-specific failure.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Build a [`HandlerError::Decode`] for `method_id`.
    #[must_use]
    pub fn decode(method_id: u16, source: DecodeError) -> Self { Self::Decode { method_id, source } }

    /// Build a [`HandlerError::Rejected`] for `method_id`.
    #[must_use]
    pub fn rejected(method_id: u16, reason: impl Into<String>) -> Self {
        Self::Rejected {
            method_id,
            reason: reason.into(),
        }
    }
}

/// Failure while feeding captured bytes into the pipeline.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IngestError {
    /// The host lifecycle was cancelled; the bytes were not decoded.
    #[error("ingest cancelled")]
    Cancelled,
    /// A decoded frame could not be queued for dispatch.
    #[error("failed to queue frame: {0}")]
    Queue(#[from] QueueError),
}
