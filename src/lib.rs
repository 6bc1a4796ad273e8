//! PDT production test harness.
//!
//! Sends a fixed catalog of JSON test commands to a device under test over
//! a serial link, reads back one line per command and records the `result`
//! field of each answer.
//!
//! # Modules
//!
//! - `catalog`: the fixed list of test cases and their command payloads
//! - `protocol`: line framing and response parsing
//! - `port`: serial link abstraction, hardware and mock implementations
//! - `connection`: open/close lifecycle of the single active link
//! - `dispatcher`: the worker that serializes exchanges on the link
//! - `results`: per-case outcomes and the result table
//! - `bench`: controller tying the above together
//! - `config`: TOML configuration with environment overrides
//! - `logging`: append-only log file
//! - `tui`: terminal operator console (when `tui` feature is enabled)

pub mod bench;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod port;
pub mod protocol;
pub mod results;

#[cfg(feature = "tui")]
pub mod tui;

pub use bench::{BenchSettings, TestBench};
pub use catalog::{TestCase, TestCatalog};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use connection::ConnectionInfo;
pub use error::{AppError, AppResult};
pub use port::{BaudRate, LinkError, LinkOpener, SerialLink};
pub use results::{ExchangeOutcome, ExchangeReport, INVALID_RESPONSE_MARKER};
