//! Telemetry polling
//!
//! One poll cycle is one request/response exchange: send the request
//! frame, give the module its response window, then read a full frame if
//! one is waiting. The module simply does not answer some requests, so a
//! missing frame is an ordinary outcome, not an error.

use std::thread;

use tracing::{debug, trace};

use super::packet::TelemetryPacket;
use super::transport::{read_exact_deadline, write_bytes, Transport};
use super::{FrameError, ProtocolError, TimingPolicy, FRAME_LEN, INIT_SEQUENCE};

/// Outcome of a single poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A full frame arrived and validated
    Telemetry(TelemetryPacket),
    /// A full frame arrived but failed validation; it has been consumed
    /// and the cycle yields no data
    Invalid(FrameError),
    /// The module had not produced a full frame in time
    NoData,
}

/// Issue one telemetry request and try to read the response frame.
///
/// Fewer than [`FRAME_LEN`] bytes available after the response wait means
/// [`PollOutcome::NoData`]; a partial response is left unread. A full
/// frame that fails validation is consumed and reported as
/// [`PollOutcome::Invalid`]. Only transport faults return `Err`.
pub fn poll_once(
    transport: &mut dyn Transport,
    timing: &TimingPolicy,
) -> Result<PollOutcome, ProtocolError> {
    // Stale bytes from a late response in an earlier cycle would shift the
    // framing of every frame after them.
    transport.clear_input()?;

    write_bytes(transport, &INIT_SEQUENCE)?;
    thread::sleep(timing.response_wait);

    let available = transport.bytes_available()? as usize;
    if available < FRAME_LEN {
        trace!("no full frame after response wait ({available} bytes waiting)");
        return Ok(PollOutcome::NoData);
    }

    let mut frame = [0u8; FRAME_LEN];
    read_exact_deadline(transport, &mut frame, timing.read_timeout)?;

    match TelemetryPacket::decode(&frame) {
        Ok(packet) => Ok(PollOutcome::Telemetry(packet)),
        Err(err) => {
            debug!("discarding invalid frame: {err}");
            Ok(PollOutcome::Invalid(err))
        }
    }
}
