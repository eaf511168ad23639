//! Property-based tests for the wire protocol
//!
//! These verify the framing and decoding contracts that the rest of the
//! pipeline leans on: chunk boundaries never change what gets decoded,
//! the amplitude law holds over the whole byte range, and a frequency
//! range survives the command/config round trip.

use proptest::prelude::*;

use sweep_protocol::{
    decode_amplitude, decode_frame, DeviceCommand, DeviceMessage, FrameAccumulator,
};

/// A valid sweep frame with arbitrary amplitude bytes
fn sweep_frame_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64).prop_map(|amps| {
        let mut frame = vec![b'$', b'S', amps.len() as u8];
        frame.extend_from_slice(&amps);
        frame.push(b'\n');
        frame
    })
}

/// A valid CR/LF-terminated config frame
fn config_frame_bytes() -> impl Strategy<Value = Vec<u8>> {
    (0u32..10_000_000, 0u32..10_000_000)
        .prop_map(|(start, span)| format!("$C{:07}{:07}\r\n", start, span).into_bytes())
}

/// Line noise that cannot be mistaken for a frame start
fn noise() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        any::<u8>().prop_filter("not a start marker", |&b| b != b'$'),
        0..16,
    )
}

/// A stream of valid frames with noise in between
fn frame_stream() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        (noise(), prop_oneof![sweep_frame_bytes(), config_frame_bytes()]),
        1..8,
    )
    .prop_map(|parts| {
        let mut stream = Vec::new();
        for (garbage, frame) in parts {
            stream.extend(garbage);
            stream.extend(frame);
        }
        stream
    })
}

proptest! {
    #[test]
    fn chunking_never_changes_decoded_frames(
        stream in frame_stream(),
        splits in prop::collection::vec(0usize..1024, 0..8),
    ) {
        let mut whole = FrameAccumulator::new();
        let expected = whole.feed(&stream);

        let mut cuts: Vec<usize> = splits.into_iter().map(|s| s % (stream.len() + 1)).collect();
        cuts.sort_unstable();

        let mut acc = FrameAccumulator::new();
        let mut got = Vec::new();
        let mut prev = 0;
        for cut in cuts {
            got.extend(acc.feed(&stream[prev..cut]));
            prev = cut;
        }
        got.extend(acc.feed(&stream[prev..]));

        prop_assert_eq!(expected, got);
    }

    #[test]
    fn byte_by_byte_matches_all_at_once(stream in frame_stream()) {
        let mut whole = FrameAccumulator::new();
        let expected = whole.feed(&stream);

        let mut acc = FrameAccumulator::new();
        let mut got = Vec::new();
        for &b in &stream {
            got.extend(acc.feed(&[b]));
        }

        prop_assert_eq!(expected, got);
    }

    #[test]
    fn amplitude_law_holds_over_full_range(r in 0u8..255) {
        prop_assert_eq!(decode_amplitude(r), -(r as f32) / 2.0);
        // Strictly decreasing in the raw byte
        prop_assert!(decode_amplitude(r) > decode_amplitude(r + 1));
    }

    #[test]
    fn frequency_range_round_trips_through_config_frame(
        start_khz in 1u32..9_999_999,
        span_khz in 1u32..9_999_999,
    ) {
        let start_mhz = start_khz as f64 / 1000.0;
        let end_mhz = start_mhz + span_khz as f64 / 1000.0;

        let encoded = DeviceCommand::SetFrequencyRange { start_mhz, end_mhz }.encode();

        // The device answers a set-frequency command by echoing the same
        // two fields in a config frame
        let text = String::from_utf8(encoded).unwrap();
        let fields = text
            .trim_end()
            .strip_prefix("#0C2-F:")
            .unwrap()
            .replace(',', "");

        let mut acc = FrameAccumulator::new();
        let frames = acc.feed(format!("$C{}\r\n", fields).as_bytes());
        prop_assert_eq!(frames.len(), 1);

        match decode_frame(&frames[0]).unwrap() {
            DeviceMessage::Config(update) => {
                prop_assert!((update.start_freq_mhz - start_mhz).abs() < 0.001);
                prop_assert!((update.end_freq_mhz - end_mhz).abs() < 0.002);
            }
            other => prop_assert!(false, "expected config frame, got {:?}", other),
        }
    }
}
