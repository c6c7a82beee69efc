//! Telemetry frame decoding
//!
//! The module answers every telemetry request with a single fixed-layout
//! 22-byte frame:
//!
//! | offset | field                                  |
//! |--------|----------------------------------------|
//! | 0      | header, always `0x03`                  |
//! | 1..=2  | engine speed in RPM, big-endian        |
//! | 7      | battery voltage in decivolts           |
//! | 8      | status byte                            |
//! | 9      | raw ignition timing value              |
//! | 21     | trailer, always `0xA9`                 |
//!
//! The remaining bytes change between captures but have no established
//! meaning; they are not decoded.

use byteorder::{BigEndian, ByteOrder};
use serde::Serialize;

use super::{FrameError, FRAME_HEADER, FRAME_LEN, FRAME_TRAILER};

/// Decoded view of one telemetry frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetryPacket {
    /// Engine speed in RPM
    pub rpm: u16,
    /// Battery voltage in tenths of a volt
    pub battery_decivolts: u8,
    /// Status byte. It appears to track engine state but its encoding is
    /// not established, so it is exposed untouched.
    pub status: u8,
    /// Ignition timing as the module reports it, unscaled. The conversion
    /// to degrees is not established.
    pub timing_raw: u8,
}

impl TelemetryPacket {
    /// Validate and decode a raw frame.
    ///
    /// A frame decodes only when it is exactly [`FRAME_LEN`] bytes long,
    /// opens with [`FRAME_HEADER`] and closes with [`FRAME_TRAILER`];
    /// anything else is rejected with the first check that failed.
    pub fn decode(frame: &[u8]) -> Result<Self, FrameError> {
        if frame.len() != FRAME_LEN {
            return Err(FrameError::Length {
                actual: frame.len(),
            });
        }
        if frame[0] != FRAME_HEADER {
            return Err(FrameError::Header { actual: frame[0] });
        }
        if frame[FRAME_LEN - 1] != FRAME_TRAILER {
            return Err(FrameError::Trailer {
                actual: frame[FRAME_LEN - 1],
            });
        }

        Ok(Self {
            rpm: BigEndian::read_u16(&frame[1..3]),
            battery_decivolts: frame[7],
            status: frame[8],
            timing_raw: frame[9],
        })
    }

    /// Battery voltage in volts
    pub fn battery_volts(&self) -> f64 {
        f64::from(self.battery_decivolts) / 10.0
    }
}
