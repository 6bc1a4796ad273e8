//! Configuration schema definitions.
//!
//! Every section has defaults, so an empty or partial file is valid.

use super::error::{ConfigError, ConfigResult};
use crate::port::BaudRate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub dispatch: DispatchConfig,
    pub tui: TuiConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Reject values the bench cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        BaudRate::try_from(self.serial.default_baud).map_err(|_| {
            ConfigError::validation(
                "serial.default_baud",
                format!(
                    "{} is not one of 9600, 19200, 38400, 57600, 115200",
                    self.serial.default_baud
                ),
            )
        })?;
        if self.serial.read_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "serial.read_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.serial.response_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "serial.response_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.dispatch.queue_capacity == 0 {
            return Err(ConfigError::validation(
                "dispatch.queue_capacity",
                "must be at least 1",
            ));
        }
        if self.tui.refresh_rate_hz == 0 {
            return Err(ConfigError::validation(
                "tui.refresh_rate_hz",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Serial port configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port preselected in the port list
    pub default_port: Option<String>,
    /// Baud rate preselected in the baud list
    pub default_baud: u32,
    /// How long one read call may block
    pub read_timeout_ms: u64,
    /// How long to wait for a full response line
    pub response_timeout_ms: u64,
    /// Drop unread bytes before each command
    pub clear_input_before_send: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_port: None,
            default_baud: 115200,
            read_timeout_ms: 100,
            response_timeout_ms: 1000,
            clear_input_before_send: true,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// The configured baud rate, falling back to 115200 when unsupported.
    pub fn baud_rate(&self) -> BaudRate {
        BaudRate::try_from(self.default_baud).unwrap_or_default()
    }
}

/// Command queue configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Commands that may wait behind the one in flight
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { queue_capacity: 4 }
    }
}

/// TUI configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Theme name: "dark", "light", "nord"
    pub theme: String,
    /// Refresh rate in Hz
    pub refresh_rate_hz: u32,
    /// Maximum gap between the clicks of a double-click
    pub double_click_ms: u64,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            refresh_rate_hz: 30,
            double_click_ms: 400,
        }
    }
}

impl TuiConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.refresh_rate_hz.max(1)))
    }

    pub fn double_click_window(&self) -> Duration {
        Duration::from_millis(self.double_click_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append-only log file
    pub file: PathBuf,
    /// Filter directive: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Line format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("serial_test_log.txt"),
            level: "info".to_string(),
            format: LogFormat::Full,
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One line per event with all fields
    #[default]
    Full,
    /// Shorter single-line format
    Compact,
    /// Multi-line, human oriented
    Pretty,
}
