//! Protocol error types

use thiserror::Error;

use super::{FRAME_HEADER, FRAME_LEN, FRAME_TRAILER};

/// Errors that can occur while talking to the CDI module
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(String),

    /// I/O error on the underlying transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Expected bytes did not arrive within the read window
    #[error("Read timed out after {got} of {wanted} bytes")]
    Timeout {
        /// Bytes the exchange needed
        wanted: usize,
        /// Bytes that actually arrived before the deadline
        got: usize,
    },

    /// Operation requires an open connection
    #[error("Not connected to the CDI module")]
    NotConnected,

    /// Connection is already open
    #[error("Already connected")]
    AlreadyConnected,

    /// A telemetry frame arrived but failed validation
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// A map write died partway through the byte stream
    #[error("Map write aborted after {written} of {total} bytes: {source}")]
    WriteAborted {
        /// Bytes that made it onto the wire, command byte included
        written: usize,
        /// Bytes the full write would have sent
        total: usize,
        /// The transport failure that cut the stream short
        #[source]
        source: std::io::Error,
    },

    /// A sniffed map byte stream does not split into whole value pairs
    #[error("Map byte stream of {0} bytes is not a whole number of value pairs")]
    UnpairedMapBytes(usize),
}

/// Reasons a 22-byte telemetry frame can be rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Frame is not exactly [`FRAME_LEN`] bytes
    #[error("Expected a {}-byte frame, got {actual} bytes", FRAME_LEN)]
    Length {
        /// Length of the rejected frame
        actual: usize,
    },

    /// First byte is not [`FRAME_HEADER`]
    #[error("Bad frame header {actual:#04x}, expected {:#04x}", FRAME_HEADER)]
    Header {
        /// The byte found where the header should be
        actual: u8,
    },

    /// Last byte is not [`FRAME_TRAILER`]
    #[error("Bad frame trailer {actual:#04x}, expected {:#04x}", FRAME_TRAILER)]
    Trailer {
        /// The byte found where the trailer should be
        actual: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_messages() {
        let err = FrameError::Header { actual: 0x7F };
        assert!(err.to_string().contains("0x7f"));
        assert!(err.to_string().contains("0x03"));

        let err = FrameError::Trailer { actual: 0x00 };
        assert!(err.to_string().contains("0x00"));
        assert!(err.to_string().contains("0xa9"));
    }

    #[test]
    fn test_write_aborted_reports_progress() {
        let err = ProtocolError::WriteAborted {
            written: 3,
            total: 7,
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "link dropped"),
        };
        let text = err.to_string();
        assert!(text.contains("3 of 7"));
    }

    #[test]
    fn test_frame_error_conversion() {
        let err: ProtocolError = FrameError::Length { actual: 5 }.into();
        assert!(matches!(
            err,
            ProtocolError::Frame(FrameError::Length { actual: 5 })
        ));
    }
}
