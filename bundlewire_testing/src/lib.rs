//! Test helpers for `bundlewire`.
//!
//! Builders for wire bytes, helpers that feed a decoder in chunks, proptest
//! strategies for well-formed streams, a recording handler, and a metrics
//! capture helper.
//!
//! ```rust
//! use bundlewire::FrameDecoder;
//! use bundlewire_testing::{feed, frame_bytes, split_every};
//!
//! let bytes = frame_bytes(3, b"abc");
//! let decoder = FrameDecoder::new();
//! let frames = feed(&decoder, split_every(&bytes, 2));
//! assert_eq!(frames.len(), 1);
//! ```

pub mod chunks;
pub mod macros;
pub mod metrics;
pub mod recording;
pub mod strategies;
pub mod wire;

pub use chunks::{feed, split_at, split_every};
pub use metrics::{counter_value, debugging_recorder_setup};
pub use recording::RecordingHandler;
pub use strategies::deterministic_runner;
pub use wire::{bundle, frame_bytes, frame_bytes_with_length, message_bytes};

/// Result type used by fallible test helpers.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
