//! A handler that records what it was asked to handle.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bundlewire::{
    dispatch::{DecodedEvent, Handler, HandlerContext},
    error::HandlerError,
    frame::Frame,
    session::ConnectionId,
};

/// Records every sub-message it receives and optionally emits an event for
/// each.
///
/// Clones share the same record.
#[derive(Clone, Debug, Default)]
pub struct RecordingHandler {
    seen: Arc<Mutex<Vec<(ConnectionId, u16, Vec<u8>)>>>,
    emit: bool,
}

impl RecordingHandler {
    /// A handler that records without emitting.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// A handler that emits `TargetEligible { target_id: method_id }` for
    /// every sub-message.
    #[must_use]
    pub fn emitting() -> Self {
        Self {
            emit: true,
            ..Self::default()
        }
    }

    /// Method ids seen so far, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the record lock is poisoned.
    #[must_use]
    pub fn method_ids(&self) -> Vec<u16> {
        self.seen
            .lock()
            .expect("recording lock")
            .iter()
            .map(|(_, id, _)| *id)
            .collect()
    }

    /// Bodies seen so far, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the record lock is poisoned.
    #[must_use]
    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.seen
            .lock()
            .expect("recording lock")
            .iter()
            .map(|(_, _, body)| body.clone())
            .collect()
    }

    /// Number of sub-messages seen.
    ///
    /// # Panics
    ///
    /// Panics if the record lock is poisoned.
    #[must_use]
    pub fn count(&self) -> usize { self.seen.lock().expect("recording lock").len() }
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn handle(&self, ctx: &HandlerContext, message: &Frame) -> Result<(), HandlerError> {
        self.seen.lock().expect("recording lock").push((
            ctx.connection(),
            message.method_id(),
            message.body().to_vec(),
        ));
        if self.emit {
            ctx.emit(DecodedEvent::TargetEligible {
                target_id: u64::from(message.method_id()),
            });
        }
        Ok(())
    }
}
