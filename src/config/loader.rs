//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "PDT_TEST";

/// Config file name in the working directory
const LOCAL_CONFIG_FILE: &str = "pdt-test.toml";

/// Config file name in the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "PDT_TEST_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `PDT_TEST_CONFIG` environment variable (explicit path)
    /// 2. `./pdt-test.toml` (current directory)
    /// 3. `<platform config dir>/pdt-test/config.toml`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values; the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path, which must exist.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Bad overrides are ignored here; `load` reports them.
        if apply_env_overrides(&mut config).is_err() || config.validate().is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|p| p.exists())
}

/// `<platform config dir>/pdt-test/config.toml`, when a home directory exists.
pub fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pdt-test").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn env_var(key: &str) -> Option<(String, String)> {
    let name = format!("{}_{}", ENV_PREFIX, key);
    std::env::var(&name).ok().map(|value| (name, value))
}

fn parse_env<T: FromStr>(name: &str, value: &str, what: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(name, format!("Invalid {what}: {value}")))
}

/// Apply environment variable overrides to the configuration.
///
/// | Variable | Key |
/// |---|---|
/// | `PDT_TEST_SERIAL_PORT` | `serial.default_port` |
/// | `PDT_TEST_SERIAL_BAUD` | `serial.default_baud` |
/// | `PDT_TEST_SERIAL_READ_TIMEOUT_MS` | `serial.read_timeout_ms` |
/// | `PDT_TEST_SERIAL_RESPONSE_TIMEOUT_MS` | `serial.response_timeout_ms` |
/// | `PDT_TEST_SERIAL_CLEAR_INPUT_BEFORE_SEND` | `serial.clear_input_before_send` |
/// | `PDT_TEST_DISPATCH_QUEUE_CAPACITY` | `dispatch.queue_capacity` |
/// | `PDT_TEST_TUI_THEME` | `tui.theme` |
/// | `PDT_TEST_TUI_REFRESH_RATE_HZ` | `tui.refresh_rate_hz` |
/// | `PDT_TEST_TUI_DOUBLE_CLICK_MS` | `tui.double_click_ms` |
/// | `PDT_TEST_LOG_FILE` | `logging.file` |
/// | `PDT_TEST_LOG_LEVEL` | `logging.level` |
/// | `PDT_TEST_LOG_FORMAT` | `logging.format` |
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some((_, val)) = env_var("SERIAL_PORT") {
        config.serial.default_port = Some(val);
    }
    if let Some((name, val)) = env_var("SERIAL_BAUD") {
        config.serial.default_baud = parse_env(&name, &val, "baud rate")?;
    }
    if let Some((name, val)) = env_var("SERIAL_READ_TIMEOUT_MS") {
        config.serial.read_timeout_ms = parse_env(&name, &val, "timeout")?;
    }
    if let Some((name, val)) = env_var("SERIAL_RESPONSE_TIMEOUT_MS") {
        config.serial.response_timeout_ms = parse_env(&name, &val, "timeout")?;
    }
    if let Some((name, val)) = env_var("SERIAL_CLEAR_INPUT_BEFORE_SEND") {
        config.serial.clear_input_before_send = parse_env(&name, &val.to_lowercase(), "flag")?;
    }
    if let Some((name, val)) = env_var("DISPATCH_QUEUE_CAPACITY") {
        config.dispatch.queue_capacity = parse_env(&name, &val, "queue capacity")?;
    }
    if let Some((_, val)) = env_var("TUI_THEME") {
        config.tui.theme = val;
    }
    if let Some((name, val)) = env_var("TUI_REFRESH_RATE_HZ") {
        config.tui.refresh_rate_hz = parse_env(&name, &val, "refresh rate")?;
    }
    if let Some((name, val)) = env_var("TUI_DOUBLE_CLICK_MS") {
        config.tui.double_click_ms = parse_env(&name, &val, "interval")?;
    }
    if let Some((_, val)) = env_var("LOG_FILE") {
        config.logging.file = PathBuf::from(val);
    }
    if let Some((_, val)) = env_var("LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some((name, val)) = env_var("LOG_FORMAT") {
        config.logging.format = match val.to_lowercase().as_str() {
            "full" => LogFormat::Full,
            "compact" => LogFormat::Compact,
            "pretty" => LogFormat::Pretty,
            _ => return Err(ConfigError::env_parse(name, format!("Invalid format: {val}"))),
        };
    }

    Ok(())
}
