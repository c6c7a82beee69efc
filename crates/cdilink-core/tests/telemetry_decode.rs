//! Decoder checks against every frame captured from a live module.

use cdilink_core::demo::CAPTURED_FRAMES;
use cdilink_core::protocol::{FrameError, TelemetryPacket, FRAME_LEN};
use pretty_assertions::assert_eq;

/// (rpm, battery decivolts, status, timing) for each captured frame, read
/// off the wire during protocol bring-up
const EXPECTED: [(u16, u8, u8, u8); 7] = [
    (0, 114, 0x10, 0x04),
    (768, 114, 0x10, 0x04),
    (768, 114, 0x10, 0x04),
    (3392, 127, 0x06, 0x60),
    (1920, 120, 0x0C, 0xFF),
    (960, 116, 0x0D, 0xA5),
    (704, 115, 0x0D, 0x9C),
];

#[test]
fn test_all_captured_frames_decode_to_known_values() {
    for (index, (frame, expected)) in CAPTURED_FRAMES.iter().zip(EXPECTED).enumerate() {
        let packet = TelemetryPacket::decode(frame)
            .unwrap_or_else(|e| panic!("capture {index} failed to decode: {e}"));
        let (rpm, battery, status, timing) = expected;
        assert_eq!(packet.rpm, rpm, "capture {index} rpm");
        assert_eq!(packet.battery_decivolts, battery, "capture {index} battery");
        assert_eq!(packet.status, status, "capture {index} status");
        assert_eq!(packet.timing_raw, timing, "capture {index} timing");
    }
}

#[test]
fn test_decode_is_pure() {
    let frame = &CAPTURED_FRAMES[3];
    let first = TelemetryPacket::decode(frame).unwrap();
    let second = TelemetryPacket::decode(frame).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_every_wrong_length_is_rejected() {
    let frame = CAPTURED_FRAMES[0];
    for len in 0..FRAME_LEN {
        assert_eq!(
            TelemetryPacket::decode(&frame[..len]),
            Err(FrameError::Length { actual: len }),
            "length {len} should not decode"
        );
    }

    let mut long = frame.to_vec();
    long.extend_from_slice(&[0xA9; 4]);
    assert!(matches!(
        TelemetryPacket::decode(&long),
        Err(FrameError::Length { actual: 26 })
    ));
}

#[test]
fn test_all_zeros_frame_is_rejected() {
    assert_eq!(
        TelemetryPacket::decode(&[0u8; FRAME_LEN]),
        Err(FrameError::Header { actual: 0x00 })
    );
}

#[test]
fn test_corrupted_endpoints_are_rejected() {
    let mut bad_header = CAPTURED_FRAMES[0];
    bad_header[0] = 0x04;
    assert_eq!(
        TelemetryPacket::decode(&bad_header),
        Err(FrameError::Header { actual: 0x04 })
    );

    let mut bad_trailer = CAPTURED_FRAMES[0];
    bad_trailer[FRAME_LEN - 1] = 0xAA;
    assert_eq!(
        TelemetryPacket::decode(&bad_trailer),
        Err(FrameError::Trailer { actual: 0xAA })
    );
}

#[test]
fn test_reserved_bytes_do_not_affect_decoding() {
    // Bytes with no established meaning may hold anything.
    let mut frame = CAPTURED_FRAMES[0];
    for offset in [3, 4, 5, 6, 10, 15, 20] {
        frame[offset] = 0xFF;
    }
    let packet = TelemetryPacket::decode(&frame).unwrap();
    assert_eq!(packet.rpm, 0);
    assert_eq!(packet.battery_decivolts, 114);
}
