//! Mock serial link for tests and demos.
//!
//! `MockLink` behaves like a device that answers each written command with
//! the next scripted reply line. Clones share state, so a test can keep one
//! handle while the bench owns another.

use super::error::LinkError;
use super::traits::{LinkOpener, LinkSettings, SerialLink};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct MockLinkState {
    /// Bytes waiting to be read.
    read_queue: VecDeque<u8>,
    /// Replies released into `read_queue`, one per write.
    replies: VecDeque<Vec<u8>>,
    /// Every write, in order.
    write_log: Vec<Vec<u8>>,
    /// Error to return from the next write.
    fail_next_write: Option<String>,
    /// Number of `clear_input` calls.
    clear_count: usize,
    /// Delay applied before each reply is released.
    reply_delay: Duration,
}

/// Scripted serial link.
///
/// # Example
/// ```
/// use pdt_test::port::{MockLink, SerialLink};
///
/// let mut link = MockLink::new("MOCK0");
/// link.queue_reply(r#"{"result":"ok"}"#);
///
/// link.write_bytes(b"{\"PdtTest\":\"enter\"}\n").unwrap();
/// let mut buffer = [0u8; 64];
/// let n = link.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"{\"result\":\"ok\"}\n");
/// assert_eq!(link.write_log().len(), 1);
/// ```
#[derive(Clone)]
pub struct MockLink {
    name: String,
    state: Arc<Mutex<MockLinkState>>,
}

impl MockLink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockLinkState::default())),
        }
    }

    /// Queue a reply line for the next unanswered write. A trailing newline
    /// is added.
    pub fn queue_reply(&mut self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.push(b'\n');
        self.state.lock().replies.push_back(bytes);
    }

    /// Queue raw reply bytes for the next unanswered write, unchanged.
    pub fn queue_raw_reply(&mut self, bytes: &[u8]) {
        self.state.lock().replies.push_back(bytes.to_vec());
    }

    /// Make bytes readable immediately, independent of writes.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Fail the next write with an I/O error carrying `message`.
    pub fn fail_next_write(&mut self, message: impl Into<String>) {
        self.state.lock().fail_next_write = Some(message.into());
    }

    /// Hold each reply back for `delay` after the write that triggers it.
    pub fn set_reply_delay(&mut self, delay: Duration) {
        self.state.lock().reply_delay = delay;
    }

    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Writes decoded as UTF-8 lines, terminators included.
    pub fn written_lines(&self) -> Vec<String> {
        self.state
            .lock()
            .write_log
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub fn clear_count(&self) -> usize {
        self.state.lock().clear_count
    }

    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

impl SerialLink for MockLink {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, LinkError> {
        let delay = {
            let mut state = self.state.lock();
            if let Some(message) = state.fail_next_write.take() {
                return Err(LinkError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    message,
                )));
            }
            state.write_log.push(data.to_vec());
            state.reply_delay
        };

        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if let Some(reply) = state.replies.pop_front() {
            state.read_queue.extend(reply);
        }
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, LinkError> {
        let mut state = self.state.lock();

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            Err(LinkError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_input(&mut self) -> Result<(), LinkError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.clear_count += 1;
        Ok(())
    }
}

impl std::fmt::Debug for MockLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLink")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// Hands out clones of one [`MockLink`], or refuses to open.
#[derive(Debug, Clone)]
pub struct MockOpener {
    link: MockLink,
    failure: Arc<Mutex<Option<String>>>,
    opened: Arc<Mutex<Vec<(String, LinkSettings)>>>,
}

impl MockOpener {
    pub fn new(link: MockLink) -> Self {
        Self {
            link,
            failure: Arc::new(Mutex::new(None)),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every subsequent open fail with a configuration error.
    pub fn refuse_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Let opens succeed again.
    pub fn accept(&self) {
        *self.failure.lock() = None;
    }

    /// Port names and settings of every successful open.
    pub fn opened(&self) -> Vec<(String, LinkSettings)> {
        self.opened.lock().clone()
    }
}

impl LinkOpener for MockOpener {
    fn open(
        &self,
        port_name: &str,
        settings: &LinkSettings,
    ) -> Result<Box<dyn SerialLink>, LinkError> {
        if let Some(message) = self.failure.lock().clone() {
            return Err(LinkError::config(message));
        }
        self.opened.lock().push((port_name.to_string(), *settings));

        let mut link = self.link.clone();
        link.name = port_name.to_string();
        Ok(Box::new(link))
    }
}
