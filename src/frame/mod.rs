//! Wire-level frame types shared by the decoder, splitter and dispatcher.
//!
//! A frame on the wire is laid out as:
//!
//! ```text
//! Length:u16 | Marker:[0xF0, 0x03] | MethodId:u16 | Body:byte[Length - 6]
//! ```
//!
//! `Length` counts from its own first byte through the last body byte. The
//! marker is only used to find frame boundaries and is never stored.

use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};

use crate::byte_order::{read_wire_u16_at, write_wire_u16};

/// Sentinel bytes separating the length prefix from the method id.
pub const MARKER: [u8; 2] = [0xF0, 0x03];
/// Width of the length prefix preceding the marker.
pub const LENGTH_PREFIX_LEN: usize = 2;
/// Width of the marker.
pub const MARKER_LEN: usize = MARKER.len();
/// Width of the method id following the marker.
pub const METHOD_ID_LEN: usize = 2;
/// Length, marker and method id together.
pub const HEADER_LEN: usize = LENGTH_PREFIX_LEN + MARKER_LEN + METHOD_ID_LEN;
/// Smallest well-formed declared length: a header with an empty body.
pub const MIN_DECLARED_LENGTH: u16 = 6;

/// Return `true` when `declared` is a usable frame length.
///
/// `0xFFFF` is never produced by a well-formed sender and is treated as a
/// corrupt length alongside anything shorter than a bare header.
#[must_use]
pub const fn is_valid_declared_length(declared: u16) -> bool {
    declared >= MIN_DECLARED_LENGTH && declared < u16::MAX
}

/// Locate the first marker starting at or after `from`.
pub(crate) fn find_marker(data: &[u8], from: usize) -> Option<usize> {
    data.get(from..)?
        .windows(MARKER_LEN)
        .position(|window| window == MARKER)
        .map(|index| index + from)
}

/// A complete frame whose body is owned (or shared) independently of any
/// decoder buffer.
///
/// # Examples
///
/// ```
/// use bundlewire::frame::Frame;
///
/// let frame = Frame::new(7, &b"abcd"[..]);
/// assert_eq!(frame.declared_length(), 10);
/// assert_eq!(frame.method_id(), 7);
/// assert_eq!(frame.body().as_ref(), b"abcd");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    declared_length: u16,
    method_id: u16,
    body: Bytes,
}

impl Frame {
    /// Build a frame with a declared length matching its body.
    ///
    /// Bodies too large to describe in a `u16` carry `0xFFFF`, which
    /// receivers treat as a corrupt length.
    #[must_use]
    pub fn new(method_id: u16, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let declared_length = body
            .len()
            .checked_add(HEADER_LEN)
            .and_then(|len| u16::try_from(len).ok())
            .unwrap_or(u16::MAX);
        Self {
            declared_length,
            method_id,
            body,
        }
    }

    /// Build a frame carrying `declared_length` verbatim, even when it does
    /// not describe the body.
    #[must_use]
    pub fn from_parts(declared_length: u16, method_id: u16, body: Bytes) -> Self {
        Self {
            declared_length,
            method_id,
            body,
        }
    }

    /// Length value read from the wire. May be stale.
    #[must_use]
    pub fn declared_length(&self) -> u16 { self.declared_length }

    /// Routing identifier.
    #[must_use]
    pub fn method_id(&self) -> u16 { self.method_id }

    /// Body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes { &self.body }

    /// Consume the frame, returning its body.
    #[must_use]
    pub fn into_body(self) -> Bytes { self.body }

    /// Number of bytes this frame occupies when re-encoded.
    #[must_use]
    pub fn wire_len(&self) -> usize { HEADER_LEN + self.body.len() }

    /// Append the wire form of this frame to `dst`.
    ///
    /// The stored declared length is written as-is so frames relayed after
    /// inspection keep whatever length the sender used.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_len());
        dst.put_slice(&write_wire_u16(self.declared_length));
        dst.put_slice(&MARKER);
        dst.put_slice(&write_wire_u16(self.method_id));
        dst.put_slice(&self.body);
    }

    /// Encode this frame into a fresh buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.wire_len());
        self.encode_into(&mut dst);
        dst.freeze()
    }
}

/// A frame borrowed from a decoder's internal buffer.
///
/// Views are only valid until the decoder is next mutated; the borrow checker
/// enforces this through the lifetime `'a`. Call
/// [`to_owned_frame`](Self::to_owned_frame) to keep the data longer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameView<'a> {
    declared_length: u16,
    method_id: u16,
    body: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub(crate) fn new(declared_length: u16, method_id: u16, body: &'a [u8]) -> Self {
        Self {
            declared_length,
            method_id,
            body,
        }
    }

    /// Length value read from the wire. May be stale.
    #[must_use]
    pub fn declared_length(&self) -> u16 { self.declared_length }

    /// Routing identifier.
    #[must_use]
    pub fn method_id(&self) -> u16 { self.method_id }

    /// Body bytes, borrowed from the decoder.
    #[must_use]
    pub fn body(&self) -> &'a [u8] { self.body }

    /// Copy the view into an independently owned [`Frame`].
    #[must_use]
    pub fn to_owned_frame(&self) -> Frame {
        Frame::from_parts(
            self.declared_length,
            self.method_id,
            Bytes::copy_from_slice(self.body),
        )
    }
}

/// Location of a frame inside a byte range.
///
/// `offset` is the position of the length prefix; `body` is the byte range of
/// the body within the same input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSpan {
    /// Position of the length prefix.
    pub offset: usize,
    /// Length value read from the wire.
    pub declared_length: u16,
    /// Routing identifier.
    pub method_id: u16,
    /// Body range within the scanned input.
    pub body: Range<usize>,
}

impl FrameSpan {
    /// Describe the frame whose length prefix sits at `offset` and whose body
    /// ends at `body_end`, reading header fields from `data`.
    ///
    /// Returns `None` when the header does not fit in `data` or the body
    /// range is inverted.
    pub(crate) fn read(data: &[u8], offset: usize, body_end: usize) -> Option<Self> {
        let declared_length = read_wire_u16_at(data, offset)?;
        let method_id = read_wire_u16_at(data, offset + LENGTH_PREFIX_LEN + MARKER_LEN)?;
        let body_start = offset + HEADER_LEN;
        if body_start > body_end || body_end > data.len() {
            return None;
        }
        Some(Self {
            offset,
            declared_length,
            method_id,
            body: body_start..body_end,
        })
    }

    /// Borrow the frame described by this span from `data`.
    ///
    /// `data` must be the buffer the span was produced from.
    #[must_use]
    pub fn view<'a>(&self, data: &'a [u8]) -> FrameView<'a> {
        let body = data.get(self.body.clone()).unwrap_or_default();
        FrameView::new(self.declared_length, self.method_id, body)
    }
}
