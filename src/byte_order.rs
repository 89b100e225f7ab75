//! Helpers for the little-endian integers used on the wire.
//!
//! Every multi-byte field in a frame header is a little-endian `u16`. Keeping
//! the conversions here means the scanning code never spells out byte order
//! inline.

/// Serialise a `u16` in wire byte order (little-endian).
///
/// # Examples
///
/// ```
/// use bundlewire::byte_order::write_wire_u16;
///
/// assert_eq!(write_wire_u16(0x03F0), [0xF0, 0x03]);
/// ```
#[must_use]
pub fn write_wire_u16(value: u16) -> [u8; 2] { value.to_le_bytes() }

/// Parse a wire-order `u16` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use bundlewire::byte_order::read_wire_u16;
///
/// assert_eq!(read_wire_u16([0x0A, 0x00]), 10);
/// ```
#[must_use]
pub fn read_wire_u16(bytes: [u8; 2]) -> u16 { u16::from_le_bytes(bytes) }

/// Read a wire-order `u16` starting at `offset`, if two bytes are available.
pub(crate) fn read_wire_u16_at(buf: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    let bytes = buf.get(offset..end)?;
    <[u8; 2]>::try_from(bytes).ok().map(read_wire_u16)
}
