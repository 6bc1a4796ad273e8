//! Hardware serial link.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own
//! `SerialLink` trait so the dispatcher can be tested against mocks.

use super::error::LinkError;
use super::traits::{LinkOpener, LinkSettings, SerialLink};
use std::io::{Read, Write};

/// Blocking serial link on a real device.
pub struct HardwareLink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl HardwareLink {
    /// Open `port_name` as 8N1 without flow control.
    ///
    /// # Example
    /// ```no_run
    /// use pdt_test::port::{HardwareLink, LinkSettings};
    ///
    /// let link = HardwareLink::open("/dev/ttyUSB0", &LinkSettings::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(port_name: &str, settings: &LinkSettings) -> Result<Self, LinkError> {
        let port = serialport::new(port_name, settings.baud_rate.bits_per_second())
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => LinkError::not_found(port_name),
                serialport::ErrorKind::InvalidInput => LinkError::config(e.to_string()),
                _ => LinkError::Serial(e),
            })?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }
}

impl SerialLink for HardwareLink {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        let written = self.port.write(data)?;
        self.port.flush()?;
        Ok(written)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, LinkError> {
        self.port.read(buffer).map_err(LinkError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_input(&mut self) -> Result<(), LinkError> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(LinkError::Serial)
    }
}

impl std::fmt::Debug for HardwareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareLink")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}

/// Opens [`HardwareLink`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareOpener;

impl LinkOpener for HardwareOpener {
    fn open(
        &self,
        port_name: &str,
        settings: &LinkSettings,
    ) -> Result<Box<dyn SerialLink>, LinkError> {
        Ok(Box::new(HardwareLink::open(port_name, settings)?))
    }
}
