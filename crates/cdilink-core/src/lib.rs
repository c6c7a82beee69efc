//! # CdiLink Core Library
//!
//! Core functionality for CdiLink, a driver and toolkit for a
//! capacitor-discharge-ignition (CDI) engine-control module spoken to
//! over a USB serial adapter.
//!
//! This library provides:
//! - The serial wire protocol: double-init handshake, telemetry
//!   request/response exchange and ignition map writes
//! - Connection lifecycle management over a real port or any scripted
//!   [`protocol::Transport`]
//! - A reconnecting monitor loop for long-running telemetry sessions
//! - Tab-separated ignition map file loading
//! - CSV telemetry logging
//! - Frames captured from a live module, plus a simulator for running
//!   the whole stack without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use cdilink_core::prelude::*;
//!
//! let mut conn = Connection::new(ConnectionConfig::new("/dev/ttyUSB0"));
//! conn.connect()?;
//! if let PollOutcome::Telemetry(packet) = conn.poll_once()? {
//!     println!("{} RPM, {:.1} V", packet.rpm, packet.battery_volts());
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod datalog;
pub mod demo;
pub mod mapfile;
pub mod monitor;
pub mod protocol;

/// Re-export of the types most callers need
pub mod prelude {
    pub use crate::datalog::TelemetryLog;
    pub use crate::demo::DemoCdi;
    pub use crate::mapfile::MapFileError;
    pub use crate::monitor::{Monitor, MonitorEvent};
    pub use crate::protocol::{
        Connection, ConnectionConfig, ConnectionState, FrameError, IgnitionMap, PollOutcome,
        ProtocolError, TelemetryPacket, TimingPolicy, WriteOutcome,
    };
}

/// Library version from the crate manifest
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
