//! Core traits for the serial link abstraction.
//!
//! `SerialLink` is what the dispatcher talks to; `LinkOpener` is how the
//! connection manager obtains one. Both have hardware and mock
//! implementations so the whole request/response cycle runs in tests.

use super::error::LinkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Baud rates offered to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    /// Every selectable rate, slowest first.
    pub const ALL: [BaudRate; 5] = [
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    pub const fn bits_per_second(self) -> u32 {
        match self {
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19200,
            BaudRate::B38400 => 38400,
            BaudRate::B57600 => 57600,
            BaudRate::B115200 => 115200,
        }
    }

    /// Position of this rate in [`BaudRate::ALL`].
    pub fn position(self) -> usize {
        Self::ALL.iter().position(|b| *b == self).unwrap_or(0)
    }
}

impl Default for BaudRate {
    fn default() -> Self {
        Self::B115200
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = LinkError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|b| b.bits_per_second() == value)
            .ok_or_else(|| LinkError::config(format!("unsupported baud rate {value}")))
    }
}

impl From<BaudRate> for u32 {
    fn from(baud: BaudRate) -> Self {
        baud.bits_per_second()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits_per_second())
    }
}

/// Settings used when opening a link. Framing is always 8N1 without flow
/// control; only speed and the per-read timeout vary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: BaudRate,
    /// How long a single read may block before reporting "no data".
    pub read_timeout: Duration,
}

impl LinkSettings {
    pub fn new(baud_rate: BaudRate, read_timeout: Duration) -> Self {
        Self {
            baud_rate,
            read_timeout,
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: BaudRate::default(),
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// Byte-level operations on an open serial link.
pub trait SerialLink: Send + fmt::Debug {
    /// Write bytes, returning how many the link accepted.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, LinkError>;

    /// Read available bytes into `buffer`, returning how many were read.
    ///
    /// Implementations report "nothing yet" as an idle error
    /// (see [`LinkError::is_idle`]).
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, LinkError>;

    /// System name of the device.
    fn name(&self) -> &str;

    /// Discard anything waiting in the receive buffer.
    fn clear_input(&mut self) -> Result<(), LinkError>;
}

/// Opens links by device name.
pub trait LinkOpener: Send {
    fn open(
        &self,
        port_name: &str,
        settings: &LinkSettings,
    ) -> Result<Box<dyn SerialLink>, LinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = LinkSettings::default();
        assert_eq!(settings.baud_rate, BaudRate::B115200);
        assert_eq!(settings.read_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_baud_rate_from_u32() {
        assert_eq!(BaudRate::try_from(9600).unwrap(), BaudRate::B9600);
        assert_eq!(BaudRate::try_from(57600).unwrap(), BaudRate::B57600);
        assert!(BaudRate::try_from(4800).is_err());
        assert!(BaudRate::try_from(0).is_err());
    }

    #[test]
    fn test_baud_rate_choices_are_ordered() {
        let rates: Vec<u32> = BaudRate::ALL.iter().map(|b| b.bits_per_second()).collect();
        assert_eq!(rates, vec![9600, 19200, 38400, 57600, 115200]);
        assert_eq!(BaudRate::B115200.position(), 4);
    }

    #[test]
    fn test_baud_rate_serde_as_number() {
        let json = serde_json::to_string(&BaudRate::B38400).unwrap();
        assert_eq!(json, "38400");
        let parsed: BaudRate = serde_json::from_str("19200").unwrap();
        assert_eq!(parsed, BaudRate::B19200);
        assert!(serde_json::from_str::<BaudRate>("12345").is_err());
    }
}
