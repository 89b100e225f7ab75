//! Routing of bundled sub-messages to handlers.
//!
//! The [`DispatchPipeline`] is the single consumer of the inbound queue. For
//! every outer frame it splits the body into sub-messages, runs the handler
//! registered for each method id and forwards the events they emit as one
//! [`EventBatch`].
//!
//! Small batches run sequentially in wire order. Batches at or above the
//! configured threshold run on spawned tasks with bounded parallelism and no
//! ordering between sub-messages. Either way every sub-message finishes
//! before the batch is forwarded, and a failing or panicking handler only
//! loses its own sub-message.

mod batch;
mod builder;
mod handler;

use std::{panic::AssertUnwindSafe, sync::Arc};

pub use batch::{BatchReceiver, BatchSender, DecodedEvent, EventBatch, EventSink, downstream_channel};
pub use builder::DispatchPipelineBuilder;
use futures::{FutureExt, StreamExt, stream};
pub use handler::{Handler, HandlerContext, HandlerFn, HandlerTable};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, trace, warn};

pub use crate::queue::InboundFrame;
use crate::{
    config::DispatchConfig,
    frame::Frame,
    metrics::{self, BatchOutcome, DispatchOutcome},
    panic::format_panic,
    queue::InboundQueue,
    session::SessionStore,
    splitter,
};

/// Consumes outer frames and forwards aggregated handler events.
///
/// Construct with [`DispatchPipeline::builder`].
pub struct DispatchPipeline {
    handlers: Arc<HandlerTable>,
    session: Arc<dyn SessionStore>,
    config: DispatchConfig,
    downstream: BatchSender,
}

impl std::fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPipeline")
            .field("handlers", &self.handlers)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DispatchPipeline {
    /// Start building a pipeline.
    pub fn builder() -> DispatchPipelineBuilder { DispatchPipelineBuilder::new() }

    /// Execution settings in use.
    #[must_use]
    pub fn config(&self) -> DispatchConfig { self.config }

    /// Session shared with handlers.
    #[must_use]
    pub fn session(&self) -> &Arc<dyn SessionStore> { &self.session }

    /// Consume `inbound` until it closes or `shutdown` is cancelled.
    ///
    /// Cancellation is only observed between outer frames; a batch already
    /// being processed runs to completion and is forwarded first.
    pub async fn run(self, mut inbound: InboundQueue, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    debug!("dispatch loop cancelled");
                    break;
                }

                next = inbound.recv() => match next {
                    Some(frame) => {
                        if let Some(batch) = self.process(frame).await {
                            self.forward(batch);
                        }
                    }
                    None => {
                        debug!("inbound queue closed; dispatch loop exiting");
                        break;
                    }
                },
            }
        }
    }

    /// Split one outer frame, run its handlers and collect their events.
    ///
    /// When the body holds no bundled header, the outer frame itself is
    /// dispatched as the only sub-message. Returns `None` if no handler
    /// emitted an event.
    pub async fn process(&self, inbound: InboundFrame) -> Option<EventBatch> {
        let InboundFrame { connection, frame } = inbound;
        let mut messages = splitter::split(frame.body());
        if messages.is_empty() {
            messages.push(frame);
        }

        let events = EventSink::new();
        let ctx = HandlerContext::new(connection, Arc::clone(&self.session), events.clone());
        let count = messages.len();

        if count < self.config.concurrency_threshold() {
            trace!(connection_id = %connection, count, "dispatching sequentially");
            for message in messages {
                dispatch_one(&self.handlers, &ctx, message).await;
            }
        } else {
            trace!(
                connection_id = %connection,
                count,
                max_concurrency = self.config.max_concurrency(),
                "dispatching concurrently"
            );
            stream::iter(messages)
                .map(|message| {
                    let handlers = Arc::clone(&self.handlers);
                    let ctx = ctx.clone();
                    tokio::spawn(
                        async move { dispatch_one(&handlers, &ctx, message).await }
                            .in_current_span(),
                    )
                })
                .buffer_unordered(self.config.max_concurrency())
                .for_each(|joined| async move {
                    if let Err(e) = joined {
                        error!(connection_id = %connection, error = %e, "dispatch task failed");
                    }
                })
                .await;
        }

        let events = events.take();
        if events.is_empty() {
            return None;
        }
        Some(EventBatch { connection, events })
    }

    /// Send `batch` downstream as a single unit.
    ///
    /// A closed downstream queue is logged and the batch dropped.
    pub fn forward(&self, batch: EventBatch) {
        let connection = batch.connection;
        let count = batch.events.len();
        match self.downstream.send(batch) {
            Ok(()) => {
                debug!(connection_id = %connection, events = count, "forwarded event batch");
                metrics::inc_batches(BatchOutcome::Forwarded);
            }
            Err(_) => {
                error!(
                    connection_id = %connection,
                    events = count,
                    "downstream queue closed; dropping event batch"
                );
                metrics::inc_batches(BatchOutcome::Dropped);
            }
        }
    }
}

async fn dispatch_one(handlers: &HandlerTable, ctx: &HandlerContext, message: Frame) {
    let method_id = message.method_id();
    let Some(handler) = handlers.get(method_id) else {
        trace!(connection_id = %ctx.connection(), method_id, "no handler for method");
        metrics::inc_sub_messages(DispatchOutcome::Unrouted);
        return;
    };

    let outcome = AssertUnwindSafe(handler.handle(ctx, &message))
        .catch_unwind()
        .await;
    match outcome {
        Ok(Ok(())) => metrics::inc_sub_messages(DispatchOutcome::Handled),
        Ok(Err(e)) => {
            warn!(
                connection_id = %ctx.connection(),
                method_id,
                error = %e,
                "handler failed"
            );
            metrics::inc_sub_messages(DispatchOutcome::Failed);
        }
        Err(panic) => {
            let panic = format_panic(panic);
            warn!(
                connection_id = %ctx.connection(),
                method_id,
                panic = %panic,
                "handler panicked"
            );
            metrics::inc_sub_messages(DispatchOutcome::Failed);
        }
    }
}

#[cfg(test)]
mod tests;
