//! Byte transport abstraction
//!
//! The exchange code (handshake, telemetry, map writes) talks to a narrow
//! [`Transport`] trait rather than to `serialport` directly, so every
//! protocol path can be driven from a scripted transport in tests and
//! from [`SerialTransport`] against real hardware.

use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use serialport::SerialPort;

use super::ProtocolError;

/// How often to re-check for bytes while waiting on a read deadline
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Byte-level access to the CDI link
pub trait Transport: Read + Write + Send {
    /// Number of bytes ready to read without blocking
    fn bytes_available(&mut self) -> io::Result<u32>;

    /// Discard everything pending in the receive buffer
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Transport over a real serial port
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Wrap an already opened and configured port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialTransport {
    fn bytes_available(&mut self) -> io::Result<u32> {
        self.port
            .bytes_to_read()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

/// Put the whole buffer on the wire.
///
/// No flush: `flush` on a serial port blocks until the UART drains, and
/// every caller follows a write with a policy wait that already covers
/// transmission time.
pub fn write_bytes(transport: &mut dyn Transport, bytes: &[u8]) -> Result<(), ProtocolError> {
    transport.write_all(bytes)?;
    Ok(())
}

/// Read exactly `buf.len()` bytes, polling for availability, giving up
/// once `timeout` passes with the buffer still short.
pub fn read_exact_deadline(
    transport: &mut dyn Transport,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<(), ProtocolError> {
    let start = Instant::now();
    let mut offset = 0;

    while offset < buf.len() {
        let available = transport.bytes_available()? as usize;
        if available == 0 {
            if start.elapsed() >= timeout {
                return Err(ProtocolError::Timeout {
                    wanted: buf.len(),
                    got: offset,
                });
            }
            thread::sleep(POLL_INTERVAL);
            continue;
        }

        let to_read = available.min(buf.len() - offset);
        match transport.read(&mut buf[offset..offset + to_read]) {
            Ok(0) => {
                return Err(ProtocolError::Timeout {
                    wanted: buf.len(),
                    got: offset,
                })
            }
            Ok(n) => offset += n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Read and return whatever is waiting right now, without blocking for more
pub fn drain_available(transport: &mut dyn Transport) -> Result<Vec<u8>, ProtocolError> {
    let mut drained = Vec::new();
    let mut chunk = [0u8; 64];

    loop {
        let available = transport.bytes_available()? as usize;
        if available == 0 {
            break;
        }

        let to_read = available.min(chunk.len());
        match transport.read(&mut chunk[..to_read]) {
            Ok(0) => break,
            Ok(n) => drained.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(drained)
}
