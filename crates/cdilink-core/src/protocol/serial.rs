//! Serial port access
//!
//! Opening and enumerating the serial side of the link. The CDI module
//! sits behind a USB serial adapter and speaks 19200 baud 8N1; it draws
//! its interface power from the DTR and RTS lines and stays completely
//! silent until both are driven high.

use std::time::Duration;

use serde::Serialize;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use super::{ProtocolError, BAUD_RATE};

/// Information about a serial port available on this machine
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    /// Platform name, e.g. `/dev/ttyUSB0` or `COM5`
    pub name: String,
    /// USB vendor id, when the port is a USB adapter
    pub vid: Option<u16>,
    /// USB product id, when the port is a USB adapter
    pub pid: Option<u16>,
    /// Adapter manufacturer string, when the descriptor carries one
    pub manufacturer: Option<String>,
    /// Adapter product string, when the descriptor carries one
    pub product: Option<String>,
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => Self {
                name: info.port_name,
                vid: None,
                pid: None,
                manufacturer: None,
                product: None,
            },
        }
    }
}

/// Sort key placing likely adapter ports first: ttyACM, then ttyUSB, then
/// everything else, numeric suffix order within each group.
fn port_sort_key(name: &str) -> (u8, u32, String) {
    let group = if name.contains("ttyACM") {
        0
    } else if name.contains("ttyUSB") {
        1
    } else {
        2
    };

    let digits: String = name
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    let number = digits.parse::<u32>().unwrap_or(u32::MAX);

    (group, number, name.to_string())
}

/// List serial ports on this machine, most plausible adapters first.
///
/// Falls back to scanning `/dev` on Linux when the enumeration comes back
/// empty, which happens on stripped-down systems without udev.
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(PortInfo::from)
        .collect();

    #[cfg(target_os = "linux")]
    if ports.is_empty() {
        ports = scan_dev_fallback();
    }

    ports.sort_by_key(|port| port_sort_key(&port.name));
    ports
}

#[cfg(target_os = "linux")]
fn scan_dev_fallback() -> Vec<PortInfo> {
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return Vec::new();
    };

    entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("ttyACM") || name.starts_with("ttyUSB") {
                Some(PortInfo {
                    name: format!("/dev/{name}"),
                    vid: None,
                    pid: None,
                    manufacturer: None,
                    product: None,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Open `name` at the module's fixed rate, 8N1, no flow control, with the
/// given read timeout
pub fn open_port(name: &str, read_timeout: Duration) -> Result<Box<dyn SerialPort>, ProtocolError> {
    debug!("opening {name} at {BAUD_RATE} baud");
    serialport::new(name, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(read_timeout)
        .open()
        .map_err(|e| ProtocolError::Serial(format!("failed to open {name}: {e}")))
}

/// Drive DTR and RTS high. The module powers its serial interface from
/// these lines and answers nothing until both are asserted.
pub fn assert_control_lines(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.write_data_terminal_ready(true)
        .map_err(|e| ProtocolError::Serial(format!("failed to assert DTR: {e}")))?;
    port.write_request_to_send(true)
        .map_err(|e| ProtocolError::Serial(format!("failed to assert RTS: {e}")))?;
    Ok(())
}

/// Discard anything pending in both directions
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(ClearBuffer::All)
        .map_err(|e| ProtocolError::Serial(format!("failed to clear buffers: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acm_sorts_before_usb() {
        let mut names = vec![
            "/dev/ttyS0".to_string(),
            "/dev/ttyUSB1".to_string(),
            "/dev/ttyACM0".to_string(),
            "/dev/ttyUSB0".to_string(),
            "/dev/ttyACM10".to_string(),
        ];
        names.sort_by_key(|name| port_sort_key(name));
        assert_eq!(
            names,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM10",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/ttyS0",
            ]
        );
    }

    #[test]
    fn test_numeric_suffix_order() {
        let mut names = vec![
            "/dev/ttyUSB10".to_string(),
            "/dev/ttyUSB2".to_string(),
            "/dev/ttyUSB1".to_string(),
        ];
        names.sort_by_key(|name| port_sort_key(name));
        assert_eq!(names, vec!["/dev/ttyUSB1", "/dev/ttyUSB2", "/dev/ttyUSB10"]);
    }

    #[test]
    fn test_list_ports() {
        // Environment-dependent output, only the call itself is under test.
        let _ = list_ports();
    }
}
