//! Proptest strategies for well-formed frame streams.

use std::ops::Range;

use proptest::{
    collection::vec,
    prelude::{Just, Strategy, any, prop_oneof},
    sample::select,
    test_runner::{Config as ProptestConfig, RngAlgorithm, TestRng, TestRunner},
};

/// A test runner with a fixed seed so failures reproduce across runs.
#[must_use]
pub fn deterministic_runner(cases: u32) -> TestRunner {
    let config = ProptestConfig {
        cases,
        ..ProptestConfig::default()
    };
    let rng = TestRng::deterministic_rng(RngAlgorithm::ChaCha);
    TestRunner::new_with_rng(config, rng)
}

/// Body lengths biased towards the empty body and short tails.
pub fn body_len_strategy(max_body_len: usize) -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(0usize),
        Just(1usize),
        Just(3usize),
        Just(max_body_len),
        0usize..=max_body_len,
    ]
}

/// One `(method_id, body)` pair with arbitrary body bytes.
pub fn frame_strategy(max_body_len: usize) -> impl Strategy<Value = (u16, Vec<u8>)> {
    (
        any::<u16>(),
        body_len_strategy(max_body_len).prop_flat_map(|len| vec(any::<u8>(), len)),
    )
}

/// Bytes that look like header fragments: marker halves, small length
/// bytes and the corrupt-length filler.
pub const HEADER_LIKE_BYTES: [u8; 5] = [0xF0, 0x03, 0x00, 0x06, 0xFF];

/// One `(method_id, body)` pair whose body is drawn from
/// [`HEADER_LIKE_BYTES`], so bodies regularly embed `F0 03` pairs.
pub fn marker_heavy_frame_strategy(max_body_len: usize) -> impl Strategy<Value = (u16, Vec<u8>)> {
    (
        prop_oneof![any::<u16>(), Just(0x03F0_u16)],
        body_len_strategy(max_body_len)
            .prop_flat_map(|len| vec(select(HEADER_LIKE_BYTES.to_vec()), len)),
    )
}

/// A sequence of frames with marker-heavy bodies.
pub fn marker_heavy_sequence_strategy(
    max_body_len: usize,
    frames: Range<usize>,
) -> impl Strategy<Value = Vec<(u16, Vec<u8>)>> {
    vec(marker_heavy_frame_strategy(max_body_len), frames)
}

/// A sequence of frames.
pub fn frame_sequence_strategy(
    max_body_len: usize,
    frames: Range<usize>,
) -> impl Strategy<Value = Vec<(u16, Vec<u8>)>> {
    vec(frame_strategy(max_body_len), frames)
}

/// Cut points for chunking a stream of up to `max_len` bytes.
pub fn cut_points_strategy(max_len: usize, cuts: Range<usize>) -> impl Strategy<Value = Vec<usize>> {
    vec(0..=max_len, cuts)
}
