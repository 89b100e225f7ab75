//! Growable byte region backing a frame decoder.

use std::sync::Arc;

use crate::{config::DecoderConfig, pool::BufferPool};

/// Appending `incoming` bytes would exceed the configured bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Overflow {
    pub buffered: usize,
    pub incoming: usize,
    pub limit: usize,
}

/// Contiguous stream buffer with pooled, doubling growth.
///
/// `[0, len)` holds bytes received but not yet consumed by an extraction
/// pass. Consumed bytes are removed by [`compact`](Self::compact), which
/// moves the remainder to the front so the consumed offset is always zero
/// between passes.
#[derive(Debug)]
pub struct StreamBuffer {
    storage: Vec<u8>,
    len: usize,
    initial_capacity: usize,
    max_buffered: Option<usize>,
    pool: Arc<BufferPool>,
}

impl StreamBuffer {
    pub(crate) fn new(config: DecoderConfig, pool: Arc<BufferPool>) -> Self {
        let storage = pool.rent(config.initial_capacity());
        Self {
            storage,
            len: 0,
            initial_capacity: config.initial_capacity(),
            max_buffered: config.max_buffered(),
            pool,
        }
    }

    /// Unconsumed bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] { &self.storage[..self.len] }

    /// Number of unconsumed bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.len }

    /// Whether no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Size of the underlying allocation.
    #[must_use]
    pub fn capacity(&self) -> usize { self.storage.len() }

    /// Append `bytes`, growing the region if needed.
    ///
    /// When the configured bound would be exceeded, all buffered bytes are
    /// discarded along with `bytes` and the overflow is reported.
    pub(crate) fn extend(&mut self, bytes: &[u8]) -> Result<(), Overflow> {
        let needed = self.len.saturating_add(bytes.len());
        if let Some(limit) = self.max_buffered.filter(|&limit| needed > limit) {
            let overflow = Overflow {
                buffered: self.len,
                incoming: bytes.len(),
                limit,
            };
            self.clear();
            return Err(overflow);
        }
        if needed > self.storage.len() {
            self.grow(needed);
        }
        self.storage[self.len..needed].copy_from_slice(bytes);
        self.len = needed;
        Ok(())
    }

    fn grow(&mut self, needed: usize) {
        let target = needed.max(self.storage.len().saturating_mul(2));
        let mut next = self.pool.rent(target);
        next[..self.len].copy_from_slice(&self.storage[..self.len]);
        let previous = std::mem::replace(&mut self.storage, next);
        self.pool.give_back(previous);
    }

    /// Drop the first `consumed` bytes, moving the rest to the front.
    pub(crate) fn compact(&mut self, consumed: usize) {
        let consumed = consumed.min(self.len);
        if consumed == 0 {
            return;
        }
        self.storage.copy_within(consumed..self.len, 0);
        self.len -= consumed;
    }

    /// Discard all buffered bytes, shrinking back to the initial allocation.
    pub(crate) fn clear(&mut self) {
        self.len = 0;
        if self.storage.len() > BufferPool::class_size(self.initial_capacity) {
            let next = self.pool.rent(self.initial_capacity);
            let previous = std::mem::replace(&mut self.storage, next);
            self.pool.give_back(previous);
        }
    }
}

impl Drop for StreamBuffer {
    fn drop(&mut self) { self.pool.give_back(std::mem::take(&mut self.storage)); }
}
