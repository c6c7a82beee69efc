//! Long-running telemetry monitor
//!
//! Wraps a [`Connection`] in the connect/poll/reconnect lifecycle a
//! dashboard or logger wants: poll forever, survive unplugged adapters
//! and module power cycles by retrying after a backoff, and stop promptly
//! when asked. Samples and lifecycle changes are handed to a caller
//! supplied sink as [`MonitorEvent`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tracing::{info, warn};

use crate::protocol::{
    Connection, ConnectionConfig, HandshakeOutcome, PollOutcome, ProtocolError,
};

/// Events the monitor hands to its sink, in the order they happen
#[derive(Debug)]
pub enum MonitorEvent {
    /// Port opened and handshake finished; polling starts
    Connected(HandshakeOutcome),
    /// One poll cycle finished
    Sample(PollOutcome),
    /// The transport failed or could not be opened; the monitor retries
    /// after its backoff
    ConnectionLost(ProtocolError),
}

/// Drives the poll loop for one port until canceled
pub struct Monitor {
    config: ConnectionConfig,
}

impl Monitor {
    /// Monitor for one port
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    /// Run until `cancel` is set.
    ///
    /// Connect failures and mid-session transport faults both surface as
    /// [`MonitorEvent::ConnectionLost`] followed by a reconnect attempt
    /// after `reconnect_backoff`; the retry is unbounded. The port is
    /// released on every exit path, including cancellation.
    pub fn run(&self, cancel: &AtomicBool, mut sink: impl FnMut(MonitorEvent)) {
        while !cancel.load(Ordering::Relaxed) {
            let mut conn = Connection::new(self.config.clone());

            if let Err(e) = conn.connect() {
                warn!("could not reach the module on {}: {e}", self.config.port_name);
                sink(MonitorEvent::ConnectionLost(e));
                thread::sleep(self.config.timing.reconnect_backoff);
                continue;
            }

            let outcome = conn.handshake().cloned().unwrap_or_default();
            sink(MonitorEvent::Connected(outcome));

            while !cancel.load(Ordering::Relaxed) {
                match conn.poll_once() {
                    Ok(sample) => sink(MonitorEvent::Sample(sample)),
                    Err(e) => {
                        warn!("lost {}: {e}", self.config.port_name);
                        conn.disconnect();
                        sink(MonitorEvent::ConnectionLost(e));
                        thread::sleep(self.config.timing.reconnect_backoff);
                        break;
                    }
                }
                thread::sleep(self.config.timing.cycle_pause);
            }

            let (tx, rx) = conn.counters();
            info!("session on {} closed, {tx} bytes out, {rx} bytes in", self.config.port_name);
        }
    }
}
