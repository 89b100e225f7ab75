//! Typed configuration for the decoder, dispatcher and inbound queue.
//!
//! Configuration is built in code by the host; nothing here reads files or
//! the environment. Constructors that take user-supplied values validate them
//! and return [`ConfigError`] rather than clamping silently.

use thiserror::Error;

use crate::pool::MIN_CLASS_SIZE;

/// Sub-message count at which a batch switches to concurrent execution.
pub const DEFAULT_CONCURRENCY_THRESHOLD: usize = 9;
/// Handlers allowed in flight for one concurrent batch.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Errors returned when building configuration or handler tables.
#[non_exhaustive]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The concurrency threshold was zero.
    #[error("concurrency threshold must be at least 1")]
    ZeroThreshold,
    /// The worker count was zero.
    #[error("max concurrency must be at least 1")]
    ZeroConcurrency,
    /// A bounded queue was requested with no capacity.
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
    /// The buffer bound cannot hold a single frame header.
    #[error("max buffered bytes {0} cannot hold a frame header")]
    BufferBoundTooSmall(usize),
    /// A handler was already registered for this method id.
    #[error("method id {0:#06x} was already registered")]
    DuplicateRoute(u16),
    /// A dispatch pipeline was built without a downstream queue.
    #[error("dispatch pipeline requires a downstream queue")]
    MissingDownstream,
}

/// Settings for a [`FrameDecoder`](crate::decoder::FrameDecoder).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    initial_capacity: usize,
    max_buffered: Option<usize>,
}

impl DecoderConfig {
    /// Bytes rented for a new stream buffer.
    #[must_use]
    pub const fn initial_capacity(&self) -> usize { self.initial_capacity }

    /// Upper bound on buffered, undecoded bytes. `None` means unbounded.
    #[must_use]
    pub const fn max_buffered(&self) -> Option<usize> { self.max_buffered }

    /// Replace the initial buffer capacity.
    #[must_use]
    pub const fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Bound the number of undecoded bytes a single connection may buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BufferBoundTooSmall`] if `max_buffered` is
    /// smaller than a frame header.
    pub fn with_max_buffered(mut self, max_buffered: usize) -> Result<Self, ConfigError> {
        if max_buffered < crate::frame::HEADER_LEN {
            return Err(ConfigError::BufferBoundTooSmall(max_buffered));
        }
        self.max_buffered = Some(max_buffered);
        Ok(self)
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            initial_capacity: MIN_CLASS_SIZE,
            max_buffered: None,
        }
    }
}

/// Settings for the [`DispatchPipeline`](crate::dispatch::DispatchPipeline).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    concurrency_threshold: usize,
    max_concurrency: usize,
}

impl DispatchConfig {
    /// Validate and build a dispatch configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroThreshold`] or
    /// [`ConfigError::ZeroConcurrency`] when either value is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use bundlewire::config::{ConfigError, DispatchConfig};
    ///
    /// assert!(DispatchConfig::new(9, 3).is_ok());
    /// assert_eq!(DispatchConfig::new(9, 0), Err(ConfigError::ZeroConcurrency));
    /// ```
    pub fn new(concurrency_threshold: usize, max_concurrency: usize) -> Result<Self, ConfigError> {
        if concurrency_threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(Self {
            concurrency_threshold,
            max_concurrency,
        })
    }

    /// Batches with at least this many sub-messages run concurrently.
    #[must_use]
    pub const fn concurrency_threshold(&self) -> usize { self.concurrency_threshold }

    /// Handlers allowed in flight for one concurrent batch.
    #[must_use]
    pub const fn max_concurrency(&self) -> usize { self.max_concurrency }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency_threshold: DEFAULT_CONCURRENCY_THRESHOLD,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Behaviour when a bounded inbound queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Return an error to the caller if the queue is full.
    #[default]
    ReturnErrorIfFull,
    /// Silently drop the frame.
    DropIfFull,
    /// Drop the frame but emit a log warning.
    WarnAndDropIfFull,
}

/// Settings for the inbound frame queue.
///
/// The default queue is unbounded. A bounded queue applies its
/// [`QueuePolicy`] to non-blocking pushes; awaiting pushes wait for space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueConfig {
    capacity: Option<usize>,
    policy: QueuePolicy,
}

impl QueueConfig {
    /// An unbounded queue.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            capacity: None,
            policy: QueuePolicy::ReturnErrorIfFull,
        }
    }

    /// A queue holding at most `capacity` frames.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    pub fn bounded(capacity: usize, policy: QueuePolicy) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            capacity: Some(capacity),
            policy,
        })
    }

    /// Queue capacity, or `None` when unbounded.
    #[must_use]
    pub const fn capacity(&self) -> Option<usize> { self.capacity }

    /// Policy applied when a bounded queue is full.
    #[must_use]
    pub const fn policy(&self) -> QueuePolicy { self.policy }
}
