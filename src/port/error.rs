//! Link-level error types.
//!
//! Kept separate from the crate-level `AppError` so the port layer can be
//! used (and mocked) without pulling in bench or UI concerns.

use thiserror::Error;

/// Errors that can occur while opening or talking to a serial link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The requested device does not exist.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// The device exists but could not be configured (bad baud rate, busy).
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link accepted zero bytes on write.
    #[error("Link accepted no data")]
    WriteZero,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl LinkError {
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error only means "no data arrived yet".
    ///
    /// Line reads keep polling on these until their own deadline passes.
    pub fn is_idle(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}
