//! FIFO queue carrying decoded outer frames to the dispatch pipeline.
//!
//! The queue is unbounded unless [`QueueConfig`] sets a capacity. Producers
//! hold cloneable [`InboundHandle`]s; the single consumer owns the
//! [`InboundQueue`]. On a bounded queue, [`InboundHandle::try_push`] applies
//! the configured [`QueuePolicy`] while [`InboundHandle::push`] waits for
//! space.

mod errors;

pub use errors::QueueError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    config::{QueueConfig, QueuePolicy},
    frame::Frame,
    metrics,
    session::ConnectionId,
};

/// An outer frame tagged with the connection it arrived on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundFrame {
    /// Originating connection.
    pub connection: ConnectionId,
    /// The reassembled outer frame.
    pub frame: Frame,
}

impl InboundFrame {
    /// Tag `frame` with `connection`.
    #[must_use]
    pub fn new(connection: ConnectionId, frame: Frame) -> Self { Self { connection, frame } }
}

#[derive(Clone, Debug)]
enum Sender {
    Unbounded(mpsc::UnboundedSender<InboundFrame>),
    Bounded(mpsc::Sender<InboundFrame>),
}

#[derive(Debug)]
enum Receiver {
    Unbounded(mpsc::UnboundedReceiver<InboundFrame>),
    Bounded(mpsc::Receiver<InboundFrame>),
}

/// Create a queue configured by `config`.
///
/// # Examples
///
/// ```
/// use bundlewire::{
///     config::QueueConfig,
///     frame::Frame,
///     queue::{InboundFrame, inbound_queue},
///     session::ConnectionId,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (handle, mut queue) = inbound_queue(&QueueConfig::default());
/// let frame = InboundFrame::new(ConnectionId::new(1), Frame::new(3, &b"x"[..]));
/// handle.try_push(frame.clone()).expect("queue open");
/// assert_eq!(queue.recv().await, Some(frame));
/// # }
/// ```
#[must_use]
pub fn inbound_queue(config: &QueueConfig) -> (InboundHandle, InboundQueue) {
    let (tx, rx) = match config.capacity() {
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Sender::Unbounded(tx), Receiver::Unbounded(rx))
        }
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity);
            (Sender::Bounded(tx), Receiver::Bounded(rx))
        }
    };
    (
        InboundHandle {
            tx,
            policy: config.policy(),
        },
        InboundQueue { rx },
    )
}

/// Cloneable producer side of the inbound queue.
#[derive(Clone, Debug)]
pub struct InboundHandle {
    tx: Sender,
    policy: QueuePolicy,
}

impl InboundHandle {
    /// Enqueue `frame` without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] if a bounded queue is full and the policy
    /// is [`QueuePolicy::ReturnErrorIfFull`], or [`QueueError::Closed`] if the
    /// consumer has gone away. Under the drop policies a full queue discards
    /// the frame and returns `Ok`.
    pub fn try_push(&self, frame: InboundFrame) -> Result<(), QueueError> {
        match &self.tx {
            Sender::Unbounded(tx) => tx.send(frame).map_err(|_| QueueError::Closed),
            Sender::Bounded(tx) => match tx.try_send(frame) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(dropped)) => match self.policy {
                    QueuePolicy::ReturnErrorIfFull => Err(QueueError::Full),
                    QueuePolicy::DropIfFull | QueuePolicy::WarnAndDropIfFull => {
                        if self.policy == QueuePolicy::WarnAndDropIfFull {
                            warn!(
                                connection_id = %dropped.connection,
                                method_id = dropped.frame.method_id(),
                                "inbound queue full; dropping frame"
                            );
                        }
                        metrics::inc_queue_drops();
                        Ok(())
                    }
                },
                Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
            },
        }
    }

    /// Enqueue `frame`, waiting for space on a bounded queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] if the consumer has gone away.
    pub async fn push(&self, frame: InboundFrame) -> Result<(), QueueError> {
        match &self.tx {
            Sender::Unbounded(tx) => tx.send(frame).map_err(|_| QueueError::Closed),
            Sender::Bounded(tx) => tx.send(frame).await.map_err(|_| QueueError::Closed),
        }
    }

    /// Whether the consumer has closed or dropped the queue.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match &self.tx {
            Sender::Unbounded(tx) => tx.is_closed(),
            Sender::Bounded(tx) => tx.is_closed(),
        }
    }
}

/// Consumer side of the inbound queue.
#[derive(Debug)]
pub struct InboundQueue {
    rx: Receiver,
}

impl InboundQueue {
    /// Receive the next frame, or `None` once every handle is dropped and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<InboundFrame> {
        match &mut self.rx {
            Receiver::Unbounded(rx) => rx.recv().await,
            Receiver::Bounded(rx) => rx.recv().await,
        }
    }

    /// Stop accepting new frames. Frames already queued can still be
    /// received.
    pub fn close(&mut self) {
        debug!("closing inbound queue");
        match &mut self.rx {
            Receiver::Unbounded(rx) => rx.close(),
            Receiver::Bounded(rx) => rx.close(),
        }
    }
}
