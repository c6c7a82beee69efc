//! Ignition map encoding and writing
//!
//! An ignition map is a flat table of 16-bit advance values. On the wire
//! it is the [`CMD_WRITE_MAP`] command byte followed by every value least
//! significant byte first, written one byte at a time with a fixed gap
//! between bytes. The module buffers the stream as it arrives and never
//! acknowledges; pacing is the only thing protecting it from overrun.

use std::thread;
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use super::transport::{drain_available, Transport};
use super::{ProtocolError, TimingPolicy, CMD_WRITE_MAP};

/// An ordered table of ignition advance values.
///
/// The protocol puts no bound on length and carries no row structure; how
/// the module splits the flat sequence into RPM bins is its own firmware's
/// business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnitionMap {
    values: Vec<u16>,
}

impl IgnitionMap {
    /// Build a map from advance values in table order
    pub fn new(values: Vec<u16>) -> Self {
        Self { values }
    }

    /// The advance values in table order
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// Number of values in the map
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the map holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encode to the wire payload: each value as two bytes, least
    /// significant first, values in table order. The command byte is not
    /// included.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.values.len() * 2];
        LittleEndian::write_u16_into(&self.values, &mut bytes);
        bytes
    }

    /// Rebuild a map from a wire payload, e.g. one captured by sniffing a
    /// write. Fails unless the payload splits into whole value pairs.
    pub fn from_wire(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() % 2 != 0 {
            return Err(ProtocolError::UnpairedMapBytes(bytes.len()));
        }

        let mut values = vec![0u16; bytes.len() / 2];
        LittleEndian::read_u16_into(bytes, &mut values);
        Ok(Self { values })
    }
}

/// What a completed map write produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Bytes that went onto the wire, command byte included
    pub bytes_written: usize,
    /// Whatever the module sent back after the stream. Informational only;
    /// the module is not known to acknowledge writes, and an empty
    /// response does not make the write a failure.
    pub response: Vec<u8>,
}

/// Stream a map to the module.
///
/// Every byte, the command byte included, goes out individually with
/// `map_byte_gap` in between. A transport fault mid-stream aborts with
/// [`ProtocolError::WriteAborted`] carrying how far the stream got; the
/// module is left holding a partial map, so the caller should retry the
/// whole write once the link is back.
pub fn write_map(
    transport: &mut dyn Transport,
    map: &IgnitionMap,
    timing: &TimingPolicy,
) -> Result<WriteOutcome, ProtocolError> {
    fn send_paced(
        transport: &mut dyn Transport,
        byte: u8,
        gap: Duration,
        written: &mut usize,
        total: usize,
    ) -> Result<(), ProtocolError> {
        if let Err(source) = transport.write_all(&[byte]) {
            return Err(ProtocolError::WriteAborted {
                written: *written,
                total,
                source,
            });
        }
        *written += 1;
        // One byte takes about half a millisecond on the wire at 19200 baud;
        // the gap covers transmission plus the module's handling time.
        thread::sleep(gap);
        Ok(())
    }

    // Anything already in the receive buffer would masquerade as a write
    // response when drained below.
    transport.clear_input()?;

    let payload = map.encode();
    let total = payload.len() + 1;
    let mut written = 0;

    debug!("writing {} map values ({total} bytes)", map.len());

    send_paced(transport, CMD_WRITE_MAP, timing.map_byte_gap, &mut written, total)?;
    for &byte in &payload {
        send_paced(transport, byte, timing.map_byte_gap, &mut written, total)?;
    }

    thread::sleep(timing.post_write_wait);
    let response = drain_available(transport)?;
    if response.is_empty() {
        debug!("map write finished, no response");
    } else {
        debug!(
            "map write finished, module sent {} bytes: {:02x?}",
            response.len(),
            response
        );
    }

    Ok(WriteOutcome {
        bytes_written: written,
        response,
    })
}
