//! Size-class buffer pool backing decoder stream buffers.
//!
//! Buffers are handed out in power-of-two size classes so a stream buffer
//! that doubles its capacity always lands on a class boundary. Released
//! buffers are kept per class, up to a retention limit, and reused by the
//! next decoder that grows into the same class.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::trace;

/// Smallest size class handed out by the pool.
pub const MIN_CLASS_SIZE: usize = 4 * 1024;
/// Largest size class retained for reuse. Larger buffers are allocated on
/// demand and freed on release.
pub const MAX_CLASS_SIZE: usize = 16 * 1024 * 1024;
/// Default number of idle buffers retained per size class.
pub const DEFAULT_RETAINED_PER_CLASS: usize = 8;

const CLASS_COUNT: usize =
    (MAX_CLASS_SIZE.trailing_zeros() - MIN_CLASS_SIZE.trailing_zeros()) as usize + 1;

/// Pool of reusable byte buffers grouped by power-of-two size class.
///
/// # Examples
///
/// ```
/// use bundlewire::pool::BufferPool;
///
/// let pool = BufferPool::new(2);
/// let buf = pool.rent(5000);
/// assert_eq!(buf.len(), 8192);
/// pool.give_back(buf);
/// assert_eq!(pool.retained(), 1);
/// ```
#[derive(Debug)]
pub struct BufferPool {
    classes: Vec<Mutex<Vec<Vec<u8>>>>,
    retained_per_class: usize,
}

impl BufferPool {
    /// Create a pool retaining at most `retained_per_class` idle buffers in
    /// each size class.
    #[must_use]
    pub fn new(retained_per_class: usize) -> Self {
        Self {
            classes: (0..CLASS_COUNT).map(|_| Mutex::new(Vec::new())).collect(),
            retained_per_class,
        }
    }

    /// Process-wide pool shared by decoders that were not given their own.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<BufferPool>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::default())))
    }

    /// Size class that satisfies a request for `min_len` bytes.
    #[must_use]
    pub fn class_size(min_len: usize) -> usize {
        min_len
            .max(MIN_CLASS_SIZE)
            .checked_next_power_of_two()
            .unwrap_or(min_len)
    }

    fn class_index(size: usize) -> Option<usize> {
        if !size.is_power_of_two() || !(MIN_CLASS_SIZE..=MAX_CLASS_SIZE).contains(&size) {
            return None;
        }
        Some((size.trailing_zeros() - MIN_CLASS_SIZE.trailing_zeros()) as usize)
    }

    /// Rent a buffer of at least `min_len` bytes.
    ///
    /// The returned vector's length equals its size class. Reused buffers
    /// are not zeroed; callers track their own logical length.
    #[must_use]
    pub fn rent(&self, min_len: usize) -> Vec<u8> {
        let size = Self::class_size(min_len);
        let reused = Self::class_index(size)
            .and_then(|index| self.classes.get(index))
            .and_then(|class| class.lock().unwrap_or_else(PoisonError::into_inner).pop());
        match reused {
            Some(buf) => buf,
            None => {
                trace!(size, "allocating pooled buffer");
                vec![0; size]
            }
        }
    }

    /// Return a buffer to its size class.
    ///
    /// Buffers outside the pooled classes, or beyond the retention limit,
    /// are dropped.
    pub fn give_back(&self, buf: Vec<u8>) {
        let Some(class) = Self::class_index(buf.len()).and_then(|index| self.classes.get(index))
        else {
            return;
        };
        let mut idle = class.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.retained_per_class {
            idle.push(buf);
        }
    }

    /// Total number of idle buffers currently held.
    #[must_use]
    pub fn retained(&self) -> usize {
        self.classes
            .iter()
            .map(|class| class.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }
}

impl Default for BufferPool {
    fn default() -> Self { Self::new(DEFAULT_RETAINED_PER_CLASS) }
}
