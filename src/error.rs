use crate::config::ConfigError;
use crate::port::LinkError;
use thiserror::Error;

/// A specialized `Result` type for bench operations.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error type.
///
/// Every variant is something the operator can see in a dialog or the
/// status bar; none of them abort the process.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please connect to a serial port first.")]
    NotConnected,

    #[error("Already connected to {0}. Disconnect before connecting again.")]
    AlreadyConnected(String),

    #[error("No serial port selected.")]
    NoPortSelected,

    #[error("Unknown test case #{0}.")]
    UnknownCase(usize),

    #[error("Test case #{0} is still waiting for a response.")]
    AlreadyPending(usize),

    #[error("No result for test case #{0} before the deadline.")]
    NoReport(usize),

    #[error("Too many commands queued; wait for the device to answer.")]
    QueueFull,

    #[error("The command worker has stopped.")]
    WorkerStopped,

    #[error("Serial connection failed: {0}")]
    Link(#[from] LinkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("An I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_conversion() {
        let err: AppError = LinkError::not_found("COM9").into();
        assert!(matches!(err, AppError::Link(_)));
        assert_eq!(
            err.to_string(),
            "Serial connection failed: Serial port not found: COM9"
        );
    }

    #[test]
    fn test_operator_messages() {
        assert_eq!(
            AppError::NotConnected.to_string(),
            "Please connect to a serial port first."
        );
        assert!(AppError::AlreadyPending(3).to_string().contains("#3"));
    }
}
