//! Telemetry logging
//!
//! Appends decoded telemetry to a CSV file, one row per packet, with a
//! wall-clock timestamp. Rows are buffered; callers flush at checkpoints
//! they care about (the CLI flushes on shutdown).

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Local;

use crate::protocol::TelemetryPacket;

/// CSV telemetry log
pub struct TelemetryLog {
    writer: BufWriter<File>,
    rows: usize,
}

impl TelemetryLog {
    /// Create (or truncate) the file and write the header row
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "time,rpm,battery_v,status,timing_raw")?;
        Ok(Self { writer, rows: 0 })
    }

    /// Append one packet
    pub fn record(&mut self, packet: &TelemetryPacket) -> io::Result<()> {
        writeln!(
            self.writer,
            "{},{},{:.1},{},{}",
            Local::now().format("%H:%M:%S%.3f"),
            packet.rpm,
            packet.battery_volts(),
            packet.status,
            packet.timing_raw,
        )?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far, header excluded
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Push buffered rows to disk
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
