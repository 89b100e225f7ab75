//! Metric helpers for `bundlewire`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking outer frames emitted by decoders.
pub const FRAMES_DECODED: &str = "bundlewire_frames_decoded_total";
/// Name of the counter tracking length prefixes rejected as corrupt.
pub const CORRUPT_LENGTHS: &str = "bundlewire_corrupt_lengths_total";
/// Name of the counter tracking buffers discarded for exceeding their bound.
pub const BUFFER_OVERFLOWS: &str = "bundlewire_buffer_overflows_total";
/// Name of the gauge tracking live per-connection decoders.
pub const ACTIVE_DECODERS: &str = "bundlewire_active_decoders";
/// Name of the counter tracking sub-messages by dispatch outcome.
pub const SUB_MESSAGES: &str = "bundlewire_sub_messages_total";
/// Name of the counter tracking event batches by forwarding outcome.
pub const BATCHES: &str = "bundlewire_batches_total";
/// Name of the counter tracking frames dropped at a full inbound queue.
pub const QUEUE_DROPS: &str = "bundlewire_queue_drops_total";

/// Outcome of dispatching one sub-message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran to completion.
    Handled,
    /// No handler is registered for the method id.
    Unrouted,
    /// The handler returned an error or panicked.
    Failed,
}

impl DispatchOutcome {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code, reason = "labels unused without metrics"))]
    fn as_str(self) -> &'static str {
        match self {
            DispatchOutcome::Handled => "handled",
            DispatchOutcome::Unrouted => "unrouted",
            DispatchOutcome::Failed => "failed",
        }
    }
}

/// Outcome of forwarding one event batch downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The batch was enqueued for the response subsystem.
    Forwarded,
    /// The downstream queue was closed and the batch was dropped.
    Dropped,
}

impl BatchOutcome {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code, reason = "labels unused without metrics"))]
    fn as_str(self) -> &'static str {
        match self {
            BatchOutcome::Forwarded => "forwarded",
            BatchOutcome::Dropped => "dropped",
        }
    }
}

/// Record `count` decoded outer frames.
pub fn add_frames_decoded(count: usize) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_DECODED).increment(count as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record `count` corrupt length prefixes skipped during recovery.
pub fn add_corrupt_lengths(count: usize) {
    #[cfg(feature = "metrics")]
    counter!(CORRUPT_LENGTHS).increment(count as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}

/// Record a stream buffer discarded for exceeding its bound.
pub fn inc_buffer_overflows() {
    #[cfg(feature = "metrics")]
    counter!(BUFFER_OVERFLOWS).increment(1);
}

/// Increment the active decoders gauge.
pub fn inc_decoders() {
    #[cfg(feature = "metrics")]
    gauge!(ACTIVE_DECODERS).increment(1.0);
}

/// Decrement the active decoders gauge.
pub fn dec_decoders() {
    #[cfg(feature = "metrics")]
    gauge!(ACTIVE_DECODERS).decrement(1.0);
}

/// Record the outcome of one sub-message dispatch.
pub fn inc_sub_messages(outcome: DispatchOutcome) {
    #[cfg(feature = "metrics")]
    counter!(SUB_MESSAGES, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Record the outcome of forwarding one batch.
pub fn inc_batches(outcome: BatchOutcome) {
    #[cfg(feature = "metrics")]
    counter!(BATCHES, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Record a frame dropped at a full inbound queue.
pub fn inc_queue_drops() {
    #[cfg(feature = "metrics")]
    counter!(QUEUE_DROPS).increment(1);
}
