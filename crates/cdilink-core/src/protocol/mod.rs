//! CDI serial protocol
//!
//! Implements the wire protocol spoken by the CDI engine-control module:
//! the double-init handshake, the telemetry request/response exchange and
//! the ignition map write command.
//!
//! The module is a slow, stateless peer. It answers a fixed 4-byte request
//! with a fixed 22-byte frame, accepts a map as a plain byte stream after a
//! single command byte, and carries no sequence numbers or checksums the
//! host could use to resynchronize. Everything here is therefore strictly
//! one exchange at a time, paced by [`TimingPolicy`].

mod connection;
mod error;
mod handshake;
mod map;
mod packet;
pub mod serial;
mod telemetry;
mod timing;
pub mod transport;

pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use error::{FrameError, ProtocolError};
pub use handshake::{perform_handshake, HandshakeAttempt, HandshakeOutcome};
pub use map::{write_map, IgnitionMap, WriteOutcome};
pub use packet::TelemetryPacket;
pub use serial::{assert_control_lines, clear_buffers, list_ports, open_port, PortInfo};
pub use telemetry::{poll_once, PollOutcome};
pub use timing::TimingPolicy;
pub use transport::{SerialTransport, Transport};

/// Baud rate the CDI module speaks; fixed by the device, not configurable
pub const BAUD_RATE: u32 = 19200;

/// Initialization sequence; the same four bytes double as the telemetry request
pub const INIT_SEQUENCE: [u8; 4] = [0x01, 0xAB, 0xAC, 0xA1];

/// Number of init rounds the module needs before it starts answering
pub const INIT_ROUNDS: usize = 2;

/// Command byte that opens an ignition map write
pub const CMD_WRITE_MAP: u8 = 0x0D;

/// Exact length of a telemetry response frame
pub const FRAME_LEN: usize = 22;

/// First byte of every valid telemetry frame
pub const FRAME_HEADER: u8 = 0x03;

/// Last byte of every valid telemetry frame
pub const FRAME_TRAILER: u8 = 0xA9;
