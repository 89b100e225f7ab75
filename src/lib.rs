#![doc(html_root_url = "https://docs.rs/bundlewire/latest")]
//! Public API for the `bundlewire` library.
//!
//! This crate reassembles length-prefixed, marker-delimited frames from a
//! captured byte stream, decomposes bundled frames into sub-messages, and
//! dispatches those sub-messages to handlers that emit per-frame event
//! batches.

pub mod byte_order;
pub mod config;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod ingest;
pub mod message;
pub mod metrics;
pub mod panic;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod session;
pub mod splitter;

pub use config::{ConfigError, DecoderConfig, DispatchConfig, QueueConfig, QueuePolicy};
pub use decoder::{FrameDecoder, FrameViews};
pub use dispatch::{
    DecodedEvent,
    DispatchPipeline,
    EventBatch,
    Handler,
    HandlerContext,
    HandlerTable,
    downstream_channel,
};
pub use error::{HandlerError, IngestError};
pub use frame::{Frame, FrameSpan, FrameView};
pub use ingest::Ingest;
pub use metrics::{ACTIVE_DECODERS, CORRUPT_LENGTHS, FRAMES_DECODED};
pub use queue::{InboundFrame, QueueError, inbound_queue};
pub use registry::DecoderRegistry;
pub use session::{ConnectionId, InMemorySession, SessionStore};
pub use splitter::{split, split_spans};
