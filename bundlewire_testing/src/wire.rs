//! Builders for raw wire bytes.

use bundlewire::{frame::Frame, message::Message};
use bytes::{BufMut, BytesMut};

/// Encode one well-formed frame.
///
/// ```rust
/// use bundlewire_testing::frame_bytes;
///
/// assert_eq!(frame_bytes(1, b"x"), [0x07, 0x00, 0xF0, 0x03, 0x01, 0x00, b'x']);
/// ```
#[must_use]
pub fn frame_bytes(method_id: u16, body: &[u8]) -> Vec<u8> {
    Frame::new(method_id, body.to_vec()).to_bytes().to_vec()
}

/// Encode a frame whose length prefix is `declared_length` regardless of
/// the body size.
#[must_use]
pub fn frame_bytes_with_length(declared_length: u16, method_id: u16, body: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(6 + body.len());
    buf.put_u16_le(declared_length);
    buf.put_slice(&bundlewire::frame::MARKER);
    buf.put_u16_le(method_id);
    buf.put_slice(body);
    buf.to_vec()
}

/// Concatenate well-formed frames back to back.
#[must_use]
pub fn bundle(parts: &[(u16, &[u8])]) -> Vec<u8> {
    parts
        .iter()
        .flat_map(|(method_id, body)| frame_bytes(*method_id, body))
        .collect()
}

/// Encode `message` with bincode and wrap it in a frame for `method_id`.
///
/// # Panics
///
/// Panics if `message` cannot be encoded.
#[must_use]
pub fn message_bytes<M: Message>(method_id: u16, message: &M) -> Vec<u8> {
    let body = message.to_body().expect("encode test message");
    frame_bytes(method_id, &body)
}
