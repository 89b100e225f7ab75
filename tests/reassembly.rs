//! Stream reassembly properties of `FrameDecoder` and `split`.
//!
//! Property cases use a deterministic runner so failures reproduce.

use bundlewire::{
    Frame,
    FrameDecoder,
    frame::HEADER_LEN,
    split,
};
use bundlewire_testing::{
    bundle,
    deterministic_runner,
    feed,
    frame_bytes,
    frame_bytes_with_length,
    split_at,
    split_every,
    strategies::{cut_points_strategy, frame_sequence_strategy, marker_heavy_sequence_strategy},
};
use bytes::Bytes;
use proptest::{
    prelude::{Just, Strategy},
    prop_assert_eq,
    test_runner::TestCaseError,
};
use rstest::rstest;

fn expected(frames: &[(u16, Vec<u8>)]) -> Vec<Frame> {
    frames
        .iter()
        .map(|(id, body)| Frame::new(*id, body.clone()))
        .collect()
}

fn encode(frames: &[(u16, Vec<u8>)]) -> Vec<u8> {
    frames
        .iter()
        .flat_map(|(id, body)| frame_bytes(*id, body))
        .collect()
}

#[test]
fn arbitrary_chunking_round_trips() {
    let strategy = frame_sequence_strategy(64, 1..8).prop_flat_map(|frames| {
        let len = frames.iter().map(|(_, b)| b.len() + HEADER_LEN).sum::<usize>();
        (Just(frames), cut_points_strategy(len, 0..12))
    });
    let mut runner = deterministic_runner(256);

    runner
        .run(&strategy, |(frames, cuts)| {
            let stream = encode(&frames);
            let decoder = FrameDecoder::new();
            let decoded = feed(&decoder, split_at(&stream, &cuts));
            prop_assert_eq!(decoded, expected(&frames));
            prop_assert_eq!(decoder.buffered_len(), 0);
            Ok::<(), TestCaseError>(())
        })
        .expect("chunked stream reassembles");
}

#[test]
fn byte_by_byte_round_trips() {
    let mut runner = deterministic_runner(64);

    runner
        .run(&frame_sequence_strategy(40, 1..6), |frames| {
            let stream = encode(&frames);
            let decoder = FrameDecoder::new();
            let decoded = feed(&decoder, split_every(&stream, 1));
            prop_assert_eq!(decoded, expected(&frames));
            Ok(())
        })
        .expect("byte-by-byte stream reassembles");
}

#[test]
fn marker_heavy_bodies_round_trip() {
    let strategy = marker_heavy_sequence_strategy(64, 1..8).prop_flat_map(|frames| {
        let len = frames.iter().map(|(_, b)| b.len() + HEADER_LEN).sum::<usize>();
        (Just(frames), cut_points_strategy(len, 0..12))
    });
    let mut runner = deterministic_runner(512);

    runner
        .run(&strategy, |(frames, cuts)| {
            let stream = encode(&frames);

            let chunked = FrameDecoder::new();
            prop_assert_eq!(feed(&chunked, split_at(&stream, &cuts)), expected(&frames));
            prop_assert_eq!(chunked.buffered_len(), 0);

            let bytewise = FrameDecoder::new();
            prop_assert_eq!(feed(&bytewise, split_every(&stream, 1)), expected(&frames));
            prop_assert_eq!(bytewise.buffered_len(), 0);
            Ok(())
        })
        .expect("marker-heavy stream reassembles");
}

#[rstest]
#[case::whole(usize::MAX)]
#[case::pairs(2)]
#[case::single_bytes(1)]
fn lengths_ten_and_twenty_give_bodies_four_and_fourteen(#[case] chunk: usize) {
    let stream = bundle(&[(1, &[0xA1; 4][..]), (2, &[0xB2; 14][..])]);
    let decoder = FrameDecoder::new();

    let decoded = feed(&decoder, split_every(&stream, chunk.min(stream.len())));
    let split_frames = split(&Bytes::from(stream));

    for frames in [&decoded, &split_frames] {
        let shape: Vec<(u16, u16, usize)> = frames
            .iter()
            .map(|f| (f.declared_length(), f.method_id(), f.body().len()))
            .collect();
        assert_eq!(shape, [(10, 1, 4), (20, 2, 14)]);
    }
}

#[rstest]
#[case::stale_length(6)]
#[case::zero_length(0)]
fn single_marker_overrides_declared_length(#[case] declared: u16) {
    let stream = frame_bytes_with_length(declared, 1, &[0x5C; 100]);
    let decoder = FrameDecoder::new();

    let frames = decoder.append(&stream);

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].method_id(), 1);
    assert_eq!(frames[0].body().len(), 100);
}

#[test]
fn corrupt_length_does_not_stall_the_stream() {
    let mut stream = frame_bytes_with_length(0xFFFF, 9, &[0x00; 2]);
    stream.extend(frame_bytes(4, b"recovered"));
    let decoder = FrameDecoder::new();

    let frames = decoder.append(&stream);

    assert_eq!(frames, [Frame::new(4, &b"recovered"[..])]);
}

#[test]
fn extraction_without_new_bytes_is_idempotent() {
    let mut stream = frame_bytes(1, b"whole");
    stream.extend_from_slice(&frame_bytes(2, b"half of it")[..7]);
    let decoder = FrameDecoder::new();
    assert_eq!(decoder.append(&stream).len(), 1);
    let snapshot = decoder.buffered();

    for _ in 0..3 {
        assert!(decoder.extract().is_empty());
        assert_eq!(decoder.buffered(), snapshot);
    }
}

#[test]
fn split_then_encode_reproduces_input() {
    let stream = bundle(&[(7, &b"alpha"[..]), (8, &b""[..]), (9, &b"gamma"[..])]);
    let frames = split(&Bytes::from(stream.clone()));

    let mut out = bytes::BytesMut::new();
    for frame in &frames {
        frame.encode_into(&mut out);
    }
    assert_eq!(out.as_ref(), stream.as_slice());
}
