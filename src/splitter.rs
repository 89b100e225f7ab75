//! Decomposition of a fully buffered byte range into bundled frames.
//!
//! The splitter never trusts declared lengths. Boundaries come from marker
//! adjacency alone: a frame's body runs from the end of its method id to the
//! length prefix of the next frame, or to the end of input for the last one.
//! It is used on outer frame bodies by the dispatcher and on outbound buffers
//! that are rewritten and re-sent with [`Frame::encode_into`].

use bytes::Bytes;

use crate::frame::{Frame, FrameSpan, LENGTH_PREFIX_LEN, MARKER_LEN, METHOD_ID_LEN, find_marker};

/// Locate every bundled frame in `data`.
///
/// Returns an empty vector when `data` holds no marker. A marker too close to
/// the end to carry a method id is treated as body data of the frame before
/// it.
///
/// # Examples
///
/// ```
/// use bundlewire::splitter::split_spans;
///
/// let data = [0x07, 0x00, 0xF0, 0x03, 0x01, 0x00, 0xAA, 0x06, 0x00, 0xF0, 0x03, 0x02, 0x00];
/// let spans = split_spans(&data);
/// assert_eq!(spans.len(), 2);
/// assert_eq!(spans[0].body, 6..7);
/// assert_eq!(spans[1].method_id, 2);
/// assert!(spans[1].body.is_empty());
/// ```
#[must_use]
pub fn split_spans(data: &[u8]) -> Vec<FrameSpan> {
    let mut markers = Vec::new();
    let mut next = find_marker(data, LENGTH_PREFIX_LEN);
    while let Some(marker) = next {
        let body_start = marker + MARKER_LEN + METHOD_ID_LEN;
        if body_start > data.len() {
            break;
        }
        markers.push(marker);
        // The next length prefix may begin where this body begins, never
        // earlier.
        next = find_marker(data, body_start + LENGTH_PREFIX_LEN);
    }

    let mut spans = Vec::with_capacity(markers.len());
    for (index, marker) in markers.iter().enumerate() {
        let body_end = markers
            .get(index + 1)
            .map_or(data.len(), |following| following - LENGTH_PREFIX_LEN);
        let Some(span) = FrameSpan::read(data, marker - LENGTH_PREFIX_LEN, body_end) else {
            return Vec::new();
        };
        spans.push(span);
    }
    spans
}

/// Split `bytes` into frames whose bodies share its storage.
///
/// ```
/// use bundlewire::{frame::Frame, splitter::split};
/// use bytes::BytesMut;
///
/// let mut bundle = BytesMut::new();
/// Frame::new(1, &b"left"[..]).encode_into(&mut bundle);
/// Frame::new(2, &b"right"[..]).encode_into(&mut bundle);
///
/// let frames = split(&bundle.freeze());
/// assert_eq!(frames, [Frame::new(1, &b"left"[..]), Frame::new(2, &b"right"[..])]);
/// ```
#[must_use]
pub fn split(bytes: &Bytes) -> Vec<Frame> {
    split_spans(bytes)
        .into_iter()
        .map(|span| Frame::from_parts(span.declared_length, span.method_id, bytes.slice(span.body)))
        .collect()
}
