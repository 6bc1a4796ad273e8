//! Configuration module.
//!
//! This module provides read-only TOML configuration with environment
//! variable overrides. Nothing is ever written back.
//!
//! # Configuration Resolution
//!
//! 1. `--config <path>` on the command line
//! 2. `PDT_TEST_CONFIG` environment variable (explicit path)
//! 3. `./pdt-test.toml` (current directory)
//! 4. `<platform config dir>/pdt-test/config.toml`
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Every key has a `PDT_TEST_` variable. `[serial]`, `[dispatch]` and
//! `[tui]` keys use the section name; `[logging]` keys use `LOG`, and
//! `serial.default_port`/`serial.default_baud` drop the `default_`:
//!
//! - `PDT_TEST_SERIAL_PORT=/dev/ttyUSB0`
//! - `PDT_TEST_SERIAL_BAUD=9600`
//! - `PDT_TEST_SERIAL_RESPONSE_TIMEOUT_MS=2000`
//! - `PDT_TEST_SERIAL_CLEAR_INPUT_BEFORE_SEND=false`
//! - `PDT_TEST_TUI_DOUBLE_CLICK_MS=300`
//! - `PDT_TEST_LOG_FILE=/var/log/pdt.txt`
//!
//! # Example
//!
//! ```rust,no_run
//! use pdt_test::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! println!("Default baud: {}", loader.config().serial.default_baud);
//! # Ok::<(), pdt_test::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{Config, DispatchConfig, LogFormat, LoggingConfig, SerialConfig, TuiConfig};
