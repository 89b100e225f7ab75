//! Helpers for feeding a decoder in arbitrary chunks.

use bundlewire::{decoder::FrameDecoder, frame::Frame};

/// Split `bytes` into chunks of at most `size` bytes.
///
/// # Panics
///
/// Panics if `size` is zero.
#[must_use]
pub fn split_every(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

/// Split `bytes` at each offset in `points`.
///
/// Offsets are sorted, deduplicated and clamped to the input, so empty
/// chunks never appear.
#[must_use]
pub fn split_at(bytes: &[u8], points: &[usize]) -> Vec<Vec<u8>> {
    let mut cuts: Vec<usize> = points
        .iter()
        .map(|&p| p.min(bytes.len()))
        .filter(|&p| p > 0 && p < bytes.len())
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(bytes.len())) {
        if cut > start {
            chunks.push(bytes[start..cut].to_vec());
        }
        start = cut;
    }
    chunks
}

/// Append every chunk to `decoder` in order and collect the frames.
pub fn feed<I>(decoder: &FrameDecoder, chunks: I) -> Vec<Frame>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    chunks
        .into_iter()
        .flat_map(|chunk| decoder.append(chunk.as_ref()))
        .collect()
}
