//! Connection manager: owns the single open serial link.

use crate::error::{AppError, AppResult};
use crate::port::{BaudRate, LinkOpener, LinkSettings, SerialLink};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// A link shared between the manager and the dispatcher worker.
pub type SharedLink = Arc<Mutex<Box<dyn SerialLink>>>;

/// Handle queued jobs hold; it stops resolving once the manager disconnects.
pub type LinkHandle = Weak<Mutex<Box<dyn SerialLink>>>;

/// Details of the open connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    pub port_name: String,
    pub baud_rate: BaudRate,
    pub connected_at: DateTime<Local>,
}

/// Opens and closes the one serial connection.
pub struct ConnectionManager {
    opener: Box<dyn LinkOpener>,
    read_timeout: Duration,
    /// How long `connect` waits for an exchange still using the old link.
    release_wait: Duration,
    active: Option<(ConnectionInfo, SharedLink)>,
    /// The last closed link, alive until the worker lets go of it.
    retired: Option<LinkHandle>,
}

impl ConnectionManager {
    pub fn new(opener: Box<dyn LinkOpener>, read_timeout: Duration) -> Self {
        Self {
            opener,
            read_timeout,
            release_wait: Duration::ZERO,
            active: None,
            retired: None,
        }
    }

    /// Wait up to `wait` on connect for a closed link to be released.
    pub fn with_release_wait(mut self, wait: Duration) -> Self {
        self.release_wait = wait;
        self
    }

    /// Whether a closed link is still held by an exchange in progress.
    pub fn is_releasing(&self) -> bool {
        self.retired
            .as_ref()
            .is_some_and(|link| link.strong_count() > 0)
    }

    /// Block until the previous link is dropped, so the device is free to
    /// open again, or until `release_wait` passes.
    fn wait_for_release(&mut self) {
        if !self.is_releasing() {
            self.retired = None;
            return;
        }
        let deadline = Instant::now() + self.release_wait;
        while self.is_releasing() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        if self.is_releasing() {
            warn!("previous link still in use; opening anyway");
        } else {
            self.retired = None;
        }
    }

    /// Open `port_name` at `baud_rate`.
    ///
    /// # Errors
    ///
    /// - `AppError::NoPortSelected` for an empty port name
    /// - `AppError::AlreadyConnected` if a connection is open
    /// - `AppError::Link` if the device cannot be opened
    pub fn connect(&mut self, port_name: &str, baud_rate: BaudRate) -> AppResult<ConnectionInfo> {
        let port_name = port_name.trim();
        if port_name.is_empty() {
            return Err(AppError::NoPortSelected);
        }
        if let Some((info, _)) = &self.active {
            return Err(AppError::AlreadyConnected(info.port_name.clone()));
        }

        self.wait_for_release();
        let settings = LinkSettings::new(baud_rate, self.read_timeout);
        let link = self.opener.open(port_name, &settings).map_err(|e| {
            error!(port = port_name, baud = %baud_rate, error = %e, "serial connection failed");
            AppError::Link(e)
        })?;

        let info = ConnectionInfo {
            port_name: port_name.to_string(),
            baud_rate,
            connected_at: Local::now(),
        };
        info!(port = port_name, baud = %baud_rate, "connected to serial port");

        self.active = Some((info.clone(), Arc::new(Mutex::new(link))));
        Ok(info)
    }

    /// Close the connection, if any. Safe to call repeatedly.
    pub fn disconnect(&mut self) -> Option<ConnectionInfo> {
        let (info, link) = self.active.take()?;
        self.retired = Some(Arc::downgrade(&link));
        info!(port = %info.port_name, "serial port disconnected");
        Some(info)
    }

    pub fn is_connected(&self) -> bool {
        self.active.is_some()
    }

    pub fn info(&self) -> Option<&ConnectionInfo> {
        self.active.as_ref().map(|(info, _)| info)
    }

    /// A weak handle to the open link for queueing work.
    pub fn handle(&self) -> Option<LinkHandle> {
        self.active.as_ref().map(|(_, link)| Arc::downgrade(link))
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("read_timeout", &self.read_timeout)
            .field("active", &self.info())
            .field("releasing", &self.is_releasing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockLink, MockOpener};

    fn manager() -> (ConnectionManager, MockOpener) {
        let opener = MockOpener::new(MockLink::new("MOCK0"));
        let manager = ConnectionManager::new(Box::new(opener.clone()), Duration::from_millis(10));
        (manager, opener)
    }

    #[test]
    fn test_connect_and_disconnect() {
        let (mut manager, opener) = manager();
        assert!(!manager.is_connected());

        let info = manager.connect("/dev/ttyMOCK", BaudRate::B57600).unwrap();
        assert_eq!(info.port_name, "/dev/ttyMOCK");
        assert_eq!(info.baud_rate, BaudRate::B57600);
        assert!(manager.is_connected());

        let (port, settings) = &opener.opened()[0];
        assert_eq!(port, "/dev/ttyMOCK");
        assert_eq!(settings.baud_rate, BaudRate::B57600);
        assert_eq!(settings.read_timeout, Duration::from_millis(10));

        assert_eq!(manager.disconnect().unwrap().port_name, "/dev/ttyMOCK");
        assert!(!manager.is_connected());
        assert!(manager.disconnect().is_none());
    }

    #[test]
    fn test_empty_port_name_rejected() {
        let (mut manager, opener) = manager();
        assert!(matches!(
            manager.connect("  ", BaudRate::B9600),
            Err(AppError::NoPortSelected)
        ));
        assert!(opener.opened().is_empty());
    }

    #[test]
    fn test_second_connect_rejected() {
        let (mut manager, _) = manager();
        manager.connect("A", BaudRate::B9600).unwrap();
        assert!(matches!(
            manager.connect("B", BaudRate::B9600),
            Err(AppError::AlreadyConnected(port)) if port == "A"
        ));
        assert_eq!(manager.info().unwrap().port_name, "A");
    }

    #[test]
    fn test_open_failure_leaves_state_unchanged() {
        let (mut manager, opener) = manager();
        opener.refuse_with("Device or resource busy");

        let err = manager.connect("/dev/ttyMOCK", BaudRate::B115200).unwrap_err();
        assert!(err.to_string().contains("busy"));
        assert!(!manager.is_connected());
        assert!(manager.handle().is_none());
    }

    #[test]
    fn test_reconnect_waits_for_link_in_use() {
        let (manager, opener) = manager();
        let mut manager = manager.with_release_wait(Duration::from_secs(2));
        manager.connect("A", BaudRate::B9600).unwrap();

        let in_use = manager.handle().unwrap().upgrade().unwrap();
        manager.disconnect();
        assert!(manager.is_releasing());

        let holder = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(80));
            drop(in_use);
        });
        let started = Instant::now();
        manager.connect("A", BaudRate::B9600).unwrap();

        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(!manager.is_releasing());
        assert_eq!(opener.opened().len(), 2);
        holder.join().unwrap();
    }

    #[test]
    fn test_reconnect_gives_up_after_release_wait() {
        let (manager, _) = manager();
        let mut manager = manager.with_release_wait(Duration::from_millis(20));
        manager.connect("A", BaudRate::B9600).unwrap();
        let _in_use = manager.handle().unwrap().upgrade().unwrap();
        manager.disconnect();

        manager.connect("A", BaudRate::B9600).unwrap();
        assert!(manager.is_connected());
        assert!(manager.is_releasing());
    }

    #[test]
    fn test_handle_dies_with_disconnect() {
        let (mut manager, _) = manager();
        manager.connect("A", BaudRate::B9600).unwrap();
        let handle = manager.handle().unwrap();
        assert!(handle.upgrade().is_some());

        manager.disconnect();
        assert!(handle.upgrade().is_none());
    }
}
