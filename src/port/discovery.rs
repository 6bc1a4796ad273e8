//! Serial port enumeration.

use super::error::LinkError;
use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};

/// A selectable device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    /// System identifier passed to `connect` (`/dev/ttyUSB0`, `COM3`).
    pub name: String,
    /// Short description for the selector; empty when nothing is known.
    pub description: String,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let description = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let vendor = usb
                    .manufacturer
                    .or(usb.product)
                    .map(|m| format!(" {m}"))
                    .unwrap_or_default();
                format!("USB {:04x}:{:04x}{}", usb.vid, usb.pid, vendor)
            }
            SerialPortType::PciPort => "PCI".to_string(),
            SerialPortType::BluetoothPort => "Bluetooth".to_string(),
            SerialPortType::Unknown => String::new(),
        };

        Self {
            name: info.port_name,
            description,
        }
    }
}

/// List the serial devices currently present, sorted by name.
pub fn list_ports() -> Result<Vec<PortInfo>, LinkError> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()?
        .into_iter()
        .map(PortInfo::from)
        .collect();
    ports.sort_by(|a, b| a.name.cmp(&b.name));
    ports.dedup_by(|a, b| a.name == b.name);
    Ok(ports)
}
