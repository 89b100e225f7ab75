//! Typed decoding of sub-message bodies.
//!
//! Built-in handlers describe their bodies as bincode-encoded structs. Any
//! type deriving [`Encode`] and [`Decode`] picks up the [`Message`] helpers
//! through the blanket implementation below.

use bincode::{
    BorrowDecode,
    Encode,
    borrow_decode_from_slice,
    config,
    encode_to_vec,
    error::{DecodeError, EncodeError},
};

/// Body type carried by a routed sub-message.
pub trait Message: Encode + for<'de> BorrowDecode<'de, ()> {
    /// Serialize the message into a body byte vector.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if serialization fails.
    fn to_body(&self) -> Result<Vec<u8>, EncodeError> { encode_to_vec(self, config::standard()) }

    /// Decode a message from the front of `body`.
    ///
    /// Trailing bytes are ignored: bodies recovered by the single-frame
    /// heuristic may run past the encoded value.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the body does not start with a valid
    /// encoding of `Self`.
    fn from_body(body: &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized,
    {
        borrow_decode_from_slice(body, config::standard()).map(|(message, _)| message)
    }
}

impl<T> Message for T where for<'de> T: Encode + BorrowDecode<'de, ()> {}
