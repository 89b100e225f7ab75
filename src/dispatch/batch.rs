//! Decoded events and their per-frame aggregation.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::session::ConnectionId;

/// A typed fact produced by a handler for the response subsystem.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedEvent {
    /// The connection belongs to the named player.
    ConnectionIdentified {
        /// Server-assigned player id.
        player_id: u64,
        /// Display name.
        name: String,
    },
    /// A target became eligible for follow-up.
    TargetEligible {
        /// Server-assigned target id.
        target_id: u64,
    },
    /// A previously known target is gone.
    TargetCleared {
        /// Server-assigned target id.
        target_id: u64,
    },
}

/// Append-only, thread-safe collection of events for one outer frame.
///
/// Clones share the same storage. Handlers running concurrently may push in
/// any order.
#[derive(Clone, Debug, Default)]
pub struct EventSink(Arc<Mutex<Vec<DecodedEvent>>>);

impl EventSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Record `event`.
    pub fn push(&self, event: DecodedEvent) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize { self.0.lock().unwrap_or_else(PoisonError::into_inner).len() }

    /// Whether no event was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Remove and return every recorded event.
    #[must_use]
    pub fn take(&self) -> Vec<DecodedEvent> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Events from every sub-message of one outer frame, forwarded as a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventBatch {
    /// Connection the outer frame arrived on.
    pub connection: ConnectionId,
    /// Aggregated events, in no guaranteed order.
    pub events: Vec<DecodedEvent>,
}

/// Producer end of the downstream queue.
pub type BatchSender = mpsc::UnboundedSender<EventBatch>;
/// Consumer end of the downstream queue, held by the response subsystem.
pub type BatchReceiver = mpsc::UnboundedReceiver<EventBatch>;

/// Create the downstream queue linking the dispatcher to the response
/// subsystem.
#[must_use]
pub fn downstream_channel() -> (BatchSender, BatchReceiver) { mpsc::unbounded_channel() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_storage() {
        let sink = EventSink::new();
        let other = sink.clone();
        other.push(DecodedEvent::TargetEligible { target_id: 1 });
        sink.push(DecodedEvent::TargetCleared { target_id: 1 });

        assert_eq!(sink.len(), 2);
        assert_eq!(other.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn concurrent_pushes_are_all_kept() {
        let sink = EventSink::new();
        std::thread::scope(|scope| {
            for worker in 0..4_u64 {
                let sink = sink.clone();
                scope.spawn(move || {
                    for n in 0..25 {
                        sink.push(DecodedEvent::TargetEligible {
                            target_id: worker * 100 + n,
                        });
                    }
                });
            }
        });
        assert_eq!(sink.len(), 100);
    }
}
