//! A single extraction pass over buffered stream bytes.

use crate::{
    byte_order::read_wire_u16_at,
    frame::{
        FrameSpan,
        HEADER_LEN,
        LENGTH_PREFIX_LEN,
        MARKER_LEN,
        find_marker,
        is_valid_declared_length,
    },
};

/// Bytes that may hold the start of a header whose marker is not yet
/// complete.
const PARTIAL_HEADER_LEN: usize = LENGTH_PREFIX_LEN + MARKER_LEN - 1;

/// A length prefix rejected during the pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CorruptLength {
    pub offset: usize,
    pub declared_length: u16,
}

/// Result of scanning a buffer once.
#[derive(Debug, Default)]
pub(crate) struct Pass {
    /// Complete frames in stream order.
    pub frames: Vec<FrameSpan>,
    /// Bytes at the front of the buffer that can be discarded.
    pub consumed: usize,
    /// Length prefixes skipped as corrupt.
    pub corrupt: Vec<CorruptLength>,
}

/// Frame length to emit when the marker at `start + 2` is the last one in
/// the buffer and `available` bytes follow `start`.
///
/// `None` means the frame is still incomplete.
fn single_frame_len(declared: u16, available: usize) -> Option<usize> {
    if available < HEADER_LEN {
        return None;
    }
    if !is_valid_declared_length(declared) {
        return Some(available);
    }
    let declared = usize::from(declared);
    let overflow = available.checked_sub(declared)?;
    // A trailing header of four bytes or more would have exposed its marker.
    if overflow == 0 || overflow >= LENGTH_PREFIX_LEN + MARKER_LEN {
        Some(available)
    } else {
        Some(declared)
    }
}

/// Locate every complete frame in `data`.
///
/// Bytes before a located header can never start a frame and are counted as
/// consumed even when that header is incomplete, so running the pass again
/// over the compacted remainder finds nothing new.
pub(crate) fn extract(data: &[u8]) -> Pass {
    let mut pass = Pass::default();
    let mut scan = 0;
    loop {
        let Some(marker) = find_marker(data, scan + LENGTH_PREFIX_LEN) else {
            pass.consumed = pass
                .consumed
                .max(data.len().saturating_sub(PARTIAL_HEADER_LEN));
            break;
        };
        let start = marker - LENGTH_PREFIX_LEN;
        let Some(declared) = read_wire_u16_at(data, start) else {
            break;
        };

        let end = if find_marker(data, marker + MARKER_LEN).is_none() {
            match single_frame_len(declared, data.len() - start) {
                Some(len) => start + len,
                None => {
                    pass.consumed = start;
                    break;
                }
            }
        } else if is_valid_declared_length(declared) {
            let end = start + usize::from(declared);
            if end > data.len() {
                pass.consumed = start;
                break;
            }
            end
        } else {
            pass.corrupt.push(CorruptLength {
                offset: start,
                declared_length: declared,
            });
            pass.consumed = marker;
            scan = marker;
            continue;
        };

        let Some(span) = FrameSpan::read(data, start, end) else {
            pass.consumed = start;
            break;
        };
        pass.frames.push(span);
        pass.consumed = end;
        scan = end;
    }
    pass
}
