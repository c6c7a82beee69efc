//! Terminal output formatting
//!
//! Human-readable tables on stdout, one row per telemetry sample, plus
//! the flat JSON line format used by `--json`. Status and lifecycle
//! messages go to stderr so piped output stays parseable.

use cdilink_core::protocol::{PortInfo, TelemetryPacket};
use chrono::Local;
use serde::Serialize;

/// One telemetry sample as a flat JSON object
#[derive(Serialize)]
struct JsonSample<'a> {
    time: String,
    #[serde(flatten)]
    packet: &'a TelemetryPacket,
}

/// Serialize one sample as a JSON line with a wall-clock timestamp
pub fn json_line(packet: &TelemetryPacket) -> serde_json::Result<String> {
    serde_json::to_string(&JsonSample {
        time: Local::now().format("%H:%M:%S%.3f").to_string(),
        packet,
    })
}

/// Print the table header for monitor output
pub fn print_monitor_header() {
    println!(
        "{:<8} | {:>5} | {:>6} | {:>6} | {:>6}",
        "TIME", "RPM", "BATT", "TIMING", "STATUS"
    );
    println!("{}", "-".repeat(43));
}

/// Format one decoded sample as a table row
pub fn telemetry_row(packet: &TelemetryPacket) -> String {
    format!(
        "{:<8} | {:>5} | {:>5.1}V | {:>6} | {:>6}",
        Local::now().format("%H:%M:%S"),
        packet.rpm,
        packet.battery_volts(),
        format!("0x{:02X}", packet.timing_raw),
        format!("0x{:02X}", packet.status),
    )
}

/// Placeholder row for a cycle whose frame failed validation
pub fn invalid_row() -> String {
    format!(
        "{:<8} | {:>5} | {:>6} | {:>6} | {:>6}",
        Local::now().format("%H:%M:%S"),
        "---",
        "---",
        "---",
        "---"
    )
}

/// Print the port listing, one port per line
pub fn print_ports(ports: &[PortInfo]) {
    if ports.is_empty() {
        println!("No serial ports found.");
        return;
    }

    for port in ports {
        let mut details = Vec::new();
        if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            details.push(format!("{vid:04x}:{pid:04x}"));
        }
        if let Some(product) = &port.product {
            details.push(product.clone());
        }
        if let Some(manufacturer) = &port.manufacturer {
            details.push(manufacturer.clone());
        }

        if details.is_empty() {
            println!("{}", port.name);
        } else {
            println!("{:<16} {}", port.name, details.join("  "));
        }
    }
}
