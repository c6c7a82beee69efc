//! Connection management
//!
//! One [`Connection`] is one exclusive claim on a serial port with a CDI
//! module behind it. It owns the open/handshake/release lifecycle and
//! funnels every exchange through the same transport so nothing can
//! interleave on the wire.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::handshake::{self, HandshakeOutcome};
use super::map::{self, IgnitionMap, WriteOutcome};
use super::serial::{assert_control_lines, clear_buffers, open_port};
use super::telemetry::{self, PollOutcome};
use super::transport::{SerialTransport, Transport};
use super::{ProtocolError, TimingPolicy, FRAME_LEN, INIT_SEQUENCE};

/// Lifecycle state of a [`Connection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No port held
    Disconnected,
    /// Port open, handshake in progress
    Connecting,
    /// Handshake finished, ready for exchanges
    Connected,
    /// The last operation hit a transport fault
    Error,
}

/// Everything needed to establish one connection
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Serial port name, e.g. `/dev/ttyUSB0` or `COM5`
    pub port_name: String,
    /// Pacing and timeout policy for the link
    pub timing: TimingPolicy,
}

impl ConnectionConfig {
    /// Configuration for a port with the default timing policy
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            timing: TimingPolicy::default(),
        }
    }
}

/// Exclusive handle to a CDI module on a serial port
pub struct Connection {
    transport: Option<Box<dyn Transport>>,
    state: ConnectionState,
    config: ConnectionConfig,
    handshake: Option<HandshakeOutcome>,
    tx_bytes: u64,
    rx_bytes: u64,
}

impl Connection {
    /// New connection in the disconnected state
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            transport: None,
            state: ConnectionState::Disconnected,
            config,
            handshake: None,
            tx_bytes: 0,
            rx_bytes: 0,
        }
    }

    /// Open the port, drive the control lines and run the handshake.
    ///
    /// On success the connection is ready for [`poll_once`](Self::poll_once)
    /// and [`write_map`](Self::write_map) even when the module never
    /// acknowledged the handshake. On failure no port is held.
    pub fn connect(&mut self) -> Result<(), ProtocolError> {
        if self.state == ConnectionState::Connected {
            return Err(ProtocolError::AlreadyConnected);
        }

        // A failed exchange leaves the port held in the `Error` state;
        // release it before reopening.
        self.disconnect();
        self.state = ConnectionState::Connecting;

        match self.open_transport() {
            Ok(transport) => self.connect_over(transport),
            Err(e) => {
                self.state = ConnectionState::Error;
                Err(e)
            }
        }
    }

    fn open_transport(&self) -> Result<Box<dyn Transport>, ProtocolError> {
        let mut port = open_port(&self.config.port_name, self.config.timing.read_timeout)?;
        assert_control_lines(port.as_mut())?;
        clear_buffers(port.as_mut())?;
        Ok(Box::new(SerialTransport::new(port)))
    }

    /// Run the handshake over an already open transport and settle the
    /// connection state
    fn connect_over(&mut self, mut transport: Box<dyn Transport>) -> Result<(), ProtocolError> {
        match handshake::perform_handshake(transport.as_mut(), &self.config.timing) {
            Ok(outcome) => {
                self.tx_bytes += (INIT_SEQUENCE.len() * outcome.attempts.len()) as u64;
                self.rx_bytes += outcome
                    .attempts
                    .iter()
                    .map(|attempt| attempt.response.len() as u64)
                    .sum::<u64>();

                if outcome.acknowledged() {
                    info!("connected to {}, module acknowledged", self.config.port_name);
                } else {
                    info!(
                        "connected to {}, module silent after init",
                        self.config.port_name
                    );
                }

                self.handshake = Some(outcome);
                self.transport = Some(transport);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Error;
                Err(e)
            }
        }
    }

    /// Release the port. Safe to call in any state.
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            debug!("closed {}", self.config.port_name);
        }
        self.handshake = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Run one telemetry request/response cycle
    pub fn poll_once(&mut self) -> Result<PollOutcome, ProtocolError> {
        let timing = self.config.timing.clone();
        let transport = self
            .transport
            .as_deref_mut()
            .ok_or(ProtocolError::NotConnected)?;

        match telemetry::poll_once(transport, &timing) {
            Ok(outcome) => {
                self.tx_bytes += INIT_SEQUENCE.len() as u64;
                if !matches!(outcome, PollOutcome::NoData) {
                    self.rx_bytes += FRAME_LEN as u64;
                }
                Ok(outcome)
            }
            Err(e) => {
                self.state = ConnectionState::Error;
                Err(e)
            }
        }
    }

    /// Stream an ignition map to the module
    pub fn write_map(&mut self, map: &IgnitionMap) -> Result<WriteOutcome, ProtocolError> {
        let timing = self.config.timing.clone();
        let transport = self
            .transport
            .as_deref_mut()
            .ok_or(ProtocolError::NotConnected)?;

        match map::write_map(transport, map, &timing) {
            Ok(outcome) => {
                self.tx_bytes += outcome.bytes_written as u64;
                self.rx_bytes += outcome.response.len() as u64;
                Ok(outcome)
            }
            Err(e) => {
                if let ProtocolError::WriteAborted { written, .. } = &e {
                    self.tx_bytes += *written as u64;
                }
                self.state = ConnectionState::Error;
                Err(e)
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// What the handshake observed, once connected
    pub fn handshake(&self) -> Option<&HandshakeOutcome> {
        self.handshake.as_ref()
    }

    /// The port this connection is configured for
    pub fn port_name(&self) -> &str {
        &self.config.port_name
    }

    /// Cumulative protocol bytes (sent, received) over the lifetime of
    /// this connection
    pub fn counters(&self) -> (u64, u64) {
        (self.tx_bytes, self.rx_bytes)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::io::{self, Read, Write};

    use crate::demo::CAPTURED_FRAMES;
    use crate::protocol::CMD_WRITE_MAP;

    /// Scripted module end of the link; hands out queued replies when it
    /// sees a request or map command write.
    struct ScriptedLink {
        input: VecDeque<u8>,
        replies: VecDeque<Vec<u8>>,
        fail_writes: bool,
    }

    impl ScriptedLink {
        fn with_replies(replies: Vec<Vec<u8>>) -> Self {
            Self {
                input: VecDeque::new(),
                replies: replies.into(),
                fail_writes: false,
            }
        }

        fn failing() -> Self {
            let mut link = Self::with_replies(Vec::new());
            link.fail_writes = true;
            link
        }
    }

    impl Read for ScriptedLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.input.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
            }
            let count = buf.len().min(self.input.len());
            for slot in buf.iter_mut().take(count) {
                *slot = self.input.pop_front().unwrap();
            }
            Ok(count)
        }
    }

    impl Write for ScriptedLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "link dropped"));
            }
            if buf == &INIT_SEQUENCE[..] || buf == &[CMD_WRITE_MAP][..] {
                if let Some(reply) = self.replies.pop_front() {
                    self.input.extend(reply);
                }
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for ScriptedLink {
        fn bytes_available(&mut self) -> io::Result<u32> {
            Ok(self.input.len() as u32)
        }

        fn clear_input(&mut self) -> io::Result<()> {
            self.input.clear();
            Ok(())
        }
    }

    fn scripted_config() -> ConnectionConfig {
        ConnectionConfig {
            port_name: "scripted".into(),
            timing: TimingPolicy::immediate(),
        }
    }

    #[test]
    fn test_connect_over_transport_reaches_connected() {
        let mut conn = Connection::new(scripted_config());
        let link = ScriptedLink::with_replies(vec![vec![0x55]]);

        conn.connect_over(Box::new(link)).unwrap();

        assert_eq!(conn.state(), ConnectionState::Connected);
        assert!(conn.handshake().unwrap().acknowledged());
        // Two init rounds out, one acknowledgment byte back.
        assert_eq!(conn.counters(), (8, 1));
        assert!(matches!(
            conn.connect(),
            Err(ProtocolError::AlreadyConnected)
        ));
    }

    #[test]
    fn test_exchange_counters_accumulate() {
        let mut conn = Connection::new(scripted_config());
        let link = ScriptedLink::with_replies(vec![
            Vec::new(),
            Vec::new(),
            CAPTURED_FRAMES[5].to_vec(),
        ]);
        conn.connect_over(Box::new(link)).unwrap();
        assert_eq!(conn.counters(), (8, 0));
        assert!(!conn.handshake().unwrap().acknowledged());

        match conn.poll_once().unwrap() {
            PollOutcome::Telemetry(packet) => assert_eq!(packet.rpm, 960),
            other => panic!("expected telemetry, got {other:?}"),
        }
        assert_eq!(conn.counters(), (12, 22));

        let outcome = conn.write_map(&IgnitionMap::new(vec![4730])).unwrap();
        assert_eq!(outcome.bytes_written, 3);
        assert_eq!(conn.counters(), (15, 22));
        assert_eq!(conn.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_handshake_fault_fails_the_connect() {
        let mut conn = Connection::new(scripted_config());
        let err = conn
            .connect_over(Box::new(ScriptedLink::failing()))
            .unwrap_err();

        assert!(matches!(err, ProtocolError::Io(_)));
        assert_eq!(conn.state(), ConnectionState::Error);
        assert!(conn.handshake().is_none());
        assert!(matches!(conn.poll_once(), Err(ProtocolError::NotConnected)));
    }

    #[test]
    fn test_new_connection_state() {
        let conn = Connection::new(ConnectionConfig::new("/dev/ttyUSB0"));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.counters(), (0, 0));
        assert!(conn.handshake().is_none());
        assert_eq!(conn.port_name(), "/dev/ttyUSB0");
    }

    #[test]
    fn test_exchanges_require_connection() {
        let mut conn = Connection::new(ConnectionConfig::new("/dev/ttyUSB0"));
        assert!(matches!(
            conn.poll_once(),
            Err(ProtocolError::NotConnected)
        ));
        assert!(matches!(
            conn.write_map(&IgnitionMap::new(vec![1, 2, 3])),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_disconnect_idempotent() {
        let mut conn = Connection::new(ConnectionConfig::new("/dev/ttyUSB0"));
        conn.disconnect();
        conn.disconnect();
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }
}
