//! Entry point for bytes captured from live connections.
//!
//! `Ingest` ties the decoder registry to the inbound queue: each captured
//! chunk goes to its connection's decoder and every frame it completes is
//! tagged and queued for the dispatch pipeline.

use std::sync::Arc;

use log::info;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::{
    error::IngestError,
    queue::{InboundFrame, InboundHandle, QueueError},
    registry::DecoderRegistry,
    session::ConnectionId,
};

/// Upstream side of the pipeline: registry, queue producer and lifecycle.
#[derive(Clone, Debug)]
pub struct Ingest {
    registry: Arc<DecoderRegistry>,
    queue: InboundHandle,
    shutdown: CancellationToken,
}

impl Ingest {
    /// Feed frames decoded through `registry` into `queue` until `shutdown`
    /// is cancelled.
    #[must_use]
    pub fn new(
        registry: Arc<DecoderRegistry>,
        queue: InboundHandle,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            queue,
            shutdown,
        }
    }

    /// Decoders backing this ingest point.
    #[must_use]
    pub fn registry(&self) -> &Arc<DecoderRegistry> { &self.registry }

    /// Decode `bytes` received on `connection` and queue every completed
    /// frame. Returns how many frames were queued.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Cancelled`] without touching the decoder once
    /// shutdown has begun, or [`IngestError::Queue`] if a frame could not be
    /// queued. Frames decoded after a failed push are discarded.
    pub fn on_bytes(&self, connection: ConnectionId, bytes: &[u8]) -> Result<usize, IngestError> {
        if self.shutdown.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        let frames = self.registry.append(connection, bytes);
        let count = frames.len();
        for frame in frames {
            if let Err(e) = self.queue.try_push(InboundFrame::new(connection, frame)) {
                if e == QueueError::Closed {
                    error!(connection_id = %connection, "inbound queue closed; discarding frames");
                }
                return Err(e.into());
            }
        }
        Ok(count)
    }

    /// Discard partially received data after the connection resets.
    pub fn on_reset(&self, connection: ConnectionId) {
        if self.registry.reset(connection) {
            info!("connection reset: connection_id={connection}");
        }
    }

    /// Release the decoder of a closed connection.
    pub fn on_close(&self, connection: ConnectionId) {
        if self.registry.remove(connection) {
            info!("connection closed: connection_id={connection}");
        }
    }
}
