//! Per-connection stream reassembly.
//!
//! A [`FrameDecoder`] accepts byte chunks in arrival order, with no
//! alignment to frame boundaries, and yields every frame that the chunk
//! completed. Two output modes are offered:
//!
//! - [`FrameDecoder::append`] returns owned [`Frame`]s that remain valid
//!   after the decoder is mutated again.
//! - [`FrameDecoder::append_views`] returns [`FrameViews`] borrowing the
//!   decoder's buffer. The borrow prevents further appends until the views
//!   are dropped, at which point consumed bytes are compacted away.
//!
//! Corrupt length prefixes are skipped and logged; incomplete data simply
//! waits for more bytes. Neither is reported to the caller as an error.

mod buffer;
mod scan;

use std::sync::{Arc, Mutex, PoisonError};

pub use buffer::StreamBuffer;
use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::{
    config::DecoderConfig,
    frame::{Frame, FrameSpan, FrameView},
    metrics,
    pool::BufferPool,
    session::ConnectionId,
};

/// Reassembles frames from an arbitrarily chunked byte stream.
///
/// All buffer mutation happens under one mutex, so a decoder may be shared
/// between threads behind an [`Arc`]. Appends from different threads are
/// serialised; callers must still deliver chunks in stream order.
///
/// # Examples
///
/// ```
/// use bundlewire::decoder::FrameDecoder;
///
/// let decoder = FrameDecoder::new();
/// assert!(decoder.append(&[0x0A, 0x00, 0xF0]).is_empty());
///
/// let frames = decoder.append(&[0x03, 0x07, 0x00, b'p', b'i', b'n', b'g']);
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].method_id(), 7);
/// assert_eq!(frames[0].body().as_ref(), b"ping");
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Mutex<StreamBuffer>,
    connection: Option<ConnectionId>,
}

impl FrameDecoder {
    /// Create a decoder with default settings and the shared buffer pool.
    #[must_use]
    pub fn new() -> Self { Self::with_config(DecoderConfig::default()) }

    /// Create a decoder with `config` and the shared buffer pool.
    #[must_use]
    pub fn with_config(config: DecoderConfig) -> Self {
        Self::with_pool(config, BufferPool::shared())
    }

    /// Create a decoder drawing its buffers from `pool`.
    #[must_use]
    pub fn with_pool(config: DecoderConfig, pool: Arc<BufferPool>) -> Self {
        Self {
            buffer: Mutex::new(StreamBuffer::new(config, pool)),
            connection: None,
        }
    }

    /// Tag log records from this decoder with `connection`.
    #[must_use]
    pub fn for_connection(mut self, connection: ConnectionId) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Connection this decoder was created for, if any.
    #[must_use]
    pub fn connection(&self) -> Option<ConnectionId> { self.connection }

    /// Append `bytes` and return every frame they completed, in stream
    /// order.
    ///
    /// Returned frames own their data and stay valid across later calls.
    #[must_use]
    pub fn append(&self, bytes: &[u8]) -> Vec<Frame> {
        let mut buffer = self.lock();
        if !self.push(&mut buffer, bytes) {
            return Vec::new();
        }
        self.drain(&mut buffer)
    }

    /// Run an extraction pass without adding bytes.
    ///
    /// After any `append`, this returns nothing: each pass already extracts
    /// every complete frame.
    #[must_use]
    pub fn extract(&self) -> Vec<Frame> {
        let mut buffer = self.lock();
        self.drain(&mut buffer)
    }

    /// Append `bytes` and borrow every frame they completed directly from
    /// the internal buffer.
    ///
    /// The returned [`FrameViews`] holds the decoder mutably; consumed bytes
    /// are released when it is dropped.
    ///
    /// ```
    /// use bundlewire::decoder::FrameDecoder;
    ///
    /// let mut decoder = FrameDecoder::new();
    /// let views = decoder.append_views(&[0x07, 0x00, 0xF0, 0x03, 0x02, 0x00, 0x2A]);
    /// let methods: Vec<u16> = views.iter().map(|view| view.method_id()).collect();
    /// assert_eq!(methods, [2]);
    /// drop(views);
    /// assert_eq!(decoder.buffered_len(), 0);
    /// ```
    pub fn append_views(&mut self, bytes: &[u8]) -> FrameViews<'_> {
        let connection = self.connection;
        let buffer = self
            .buffer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if !push_logged(connection, buffer, bytes) {
            return FrameViews {
                buffer,
                spans: Vec::new(),
                consumed: 0,
            };
        }
        let pass = scan_logged(connection, buffer);
        FrameViews {
            buffer,
            spans: pass.frames,
            consumed: pass.consumed,
        }
    }

    /// Discard all buffered bytes. Used when the connection resets.
    pub fn clear(&self) {
        self.lock().clear();
        debug!(connection_id = ?self.connection, "decoder cleared");
    }

    /// Number of bytes buffered but not yet part of an emitted frame.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.lock().len() }

    /// Size of the current buffer allocation.
    #[must_use]
    pub fn capacity(&self) -> usize { self.lock().capacity() }

    /// Copy of the bytes still awaiting a complete frame.
    #[must_use]
    pub fn buffered(&self) -> Bytes { Bytes::copy_from_slice(self.lock().data()) }

    fn lock(&self) -> std::sync::MutexGuard<'_, StreamBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, buffer: &mut StreamBuffer, bytes: &[u8]) -> bool {
        push_logged(self.connection, buffer, bytes)
    }

    fn drain(&self, buffer: &mut StreamBuffer) -> Vec<Frame> {
        let pass = scan_logged(self.connection, buffer);
        if pass.frames.is_empty() {
            buffer.compact(pass.consumed);
            return Vec::new();
        }
        // One copy of the consumed region; bodies are slices of it.
        let region = Bytes::copy_from_slice(&buffer.data()[..pass.consumed]);
        let frames = pass
            .frames
            .iter()
            .map(|span| {
                Frame::from_parts(
                    span.declared_length,
                    span.method_id,
                    region.slice(span.body.clone()),
                )
            })
            .collect();
        buffer.compact(pass.consumed);
        frames
    }
}

impl Default for FrameDecoder {
    fn default() -> Self { Self::new() }
}

fn push_logged(connection: Option<ConnectionId>, buffer: &mut StreamBuffer, bytes: &[u8]) -> bool {
    match buffer.extend(bytes) {
        Ok(()) => true,
        Err(overflow) => {
            error!(
                connection_id = ?connection,
                buffered = overflow.buffered,
                incoming = overflow.incoming,
                limit = overflow.limit,
                "stream buffer bound exceeded; discarding buffered bytes"
            );
            metrics::inc_buffer_overflows();
            false
        }
    }
}

fn scan_logged(connection: Option<ConnectionId>, buffer: &StreamBuffer) -> scan::Pass {
    let pass = scan::extract(buffer.data());
    for corrupt in &pass.corrupt {
        warn!(
            connection_id = ?connection,
            offset = corrupt.offset,
            declared_length = corrupt.declared_length,
            "skipping frame with corrupt length"
        );
    }
    if !pass.corrupt.is_empty() {
        metrics::add_corrupt_lengths(pass.corrupt.len());
    }
    if !pass.frames.is_empty() {
        debug!(
            connection_id = ?connection,
            frames = pass.frames.len(),
            consumed = pass.consumed,
            "decoded frames"
        );
        metrics::add_frames_decoded(pass.frames.len());
    }
    pass
}

/// Frames borrowed from a decoder's buffer by
/// [`FrameDecoder::append_views`].
///
/// Dropping this value compacts the consumed bytes out of the buffer.
#[derive(Debug)]
pub struct FrameViews<'a> {
    buffer: &'a mut StreamBuffer,
    spans: Vec<FrameSpan>,
    consumed: usize,
}

impl FrameViews<'_> {
    /// Number of frames.
    #[must_use]
    pub fn len(&self) -> usize { self.spans.len() }

    /// Whether no frame was completed.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.spans.is_empty() }

    /// Borrow the frame at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<FrameView<'_>> {
        self.spans
            .get(index)
            .map(|span| span.view(self.buffer.data()))
    }

    /// Iterate the frames in stream order.
    pub fn iter(&self) -> impl Iterator<Item = FrameView<'_>> + '_ {
        let data = self.buffer.data();
        self.spans.iter().map(move |span| span.view(data))
    }

    /// Copy every view into an owned [`Frame`].
    #[must_use]
    pub fn to_frames(&self) -> Vec<Frame> { self.iter().map(|view| view.to_owned_frame()).collect() }
}

impl Drop for FrameViews<'_> {
    fn drop(&mut self) { self.buffer.compact(self.consumed); }
}
