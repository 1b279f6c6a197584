//! Bridge configuration types and TOML loading.
//!
//! [`BridgeConfig`] is the single source of truth for all runtime settings.
//! It is read from an optional TOML file, then individual fields are
//! overridden by CLI flags in `main.rs`.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration:
//!
//! ```toml
//! [control]
//! request_port = "/dev/ttyUSB0"
//! aux_port = "/dev/ttyUSB1"
//! product_uid = "com.example.notebox"
//!
//! [consoles]
//! uart_port = "/dev/ttyAMA0"
//! stdio = true
//!
//! [runtime]
//! log_level = "debug"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file.  Whole tables
//! use `#[serde(default)]` so a file may omit `[consoles]` entirely.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub consoles: ConsoleConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Control-module links and the shape of outbound commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ControlConfig {
    /// Serial port carrying requests, commands and their responses.
    #[serde(default = "default_request_port")]
    pub request_port: String,
    /// Serial port carrying inbound notifications.
    #[serde(default = "default_aux_port")]
    pub aux_port: String,
    /// Baud rate for both control-module links.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// How long a request waits for its response line.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Product identifier sent with `hub.set`; omitted when empty.
    #[serde(default)]
    pub product_uid: String,
    /// Route alias that relay-bound posts are addressed to.
    #[serde(default = "default_route_alias")]
    pub route_alias: String,
    /// Lifetime in seconds of live posts and signals.
    #[serde(default = "default_live_seconds")]
    pub live_seconds: u32,
    /// Size of the host's notification receive buffer.  The control module is
    /// told to send at most one byte less before pausing.
    #[serde(default = "default_rx_buffer_size")]
    pub rx_buffer_size: u32,
    /// Pause the control module inserts after each `rx_buffer_size - 1` bytes.
    #[serde(default = "default_aux_pacing_ms")]
    pub aux_pacing_ms: u32,
}

/// Operator consoles.  Any combination may be enabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// UART console serial port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uart_port: Option<String>,
    /// USB console serial port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usb_port: Option<String>,
    /// Baud rate for both console ports.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Also attach the process's stdin/stdout as a console.
    #[serde(default)]
    pub stdio: bool,
}

/// Driver-loop timing and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Sleep after a poll that found nothing to do.
    #[serde(default = "default_idle_delay_ms")]
    pub idle_delay_ms: u64,
    /// Delay between failed bring-up attempts.
    #[serde(default = "default_init_retry_delay_ms")]
    pub init_retry_delay_ms: u64,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_request_port() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_aux_port() -> String {
    "/dev/ttyUSB1".to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_request_timeout_ms() -> u64 {
    2_000
}
fn default_route_alias() -> String {
    "incoming".to_string()
}
fn default_live_seconds() -> u32 {
    2
}
fn default_rx_buffer_size() -> u32 {
    64
}
fn default_aux_pacing_ms() -> u32 {
    25
}
fn default_idle_delay_ms() -> u64 {
    10
}
fn default_init_retry_delay_ms() -> u64 {
    750
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            request_port: default_request_port(),
            aux_port: default_aux_port(),
            baud_rate: default_baud_rate(),
            request_timeout_ms: default_request_timeout_ms(),
            product_uid: String::new(),
            route_alias: default_route_alias(),
            live_seconds: default_live_seconds(),
            rx_buffer_size: default_rx_buffer_size(),
            aux_pacing_ms: default_aux_pacing_ms(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            uart_port: None,
            usb_port: None,
            baud_rate: default_baud_rate(),
            stdio: false,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            idle_delay_ms: default_idle_delay_ms(),
            init_retry_delay_ms: default_init_retry_delay_ms(),
            log_level: default_log_level(),
        }
    }
}

// ── Derived values ────────────────────────────────────────────────────────────

impl ControlConfig {
    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// The `max` value of the aux subscription: one less than the buffer.
    pub fn aux_max_bytes(&self) -> u32 {
        self.rx_buffer_size.saturating_sub(1)
    }
}

impl RuntimeConfig {
    pub fn idle_delay(&self) -> Duration {
        Duration::from_millis(self.idle_delay_ms)
    }

    pub fn init_retry_delay(&self) -> Duration {
        Duration::from_millis(self.init_retry_delay_ms)
    }
}

impl BridgeConfig {
    /// Checks the values serde cannot: non-zero rates and a usable route.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "control.baud_rate",
                reason: "must be greater than zero",
            });
        }
        if self.consoles.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "consoles.baud_rate",
                reason: "must be greater than zero",
            });
        }
        if self.control.route_alias.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "control.route_alias",
                reason: "must not be empty",
            });
        }
        if self.control.rx_buffer_size < 2 {
            return Err(ConfigError::Invalid {
                field: "control.rx_buffer_size",
                reason: "must be at least 2 bytes",
            });
        }
        Ok(())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Parses a configuration from TOML text and validates it.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and
/// [`ConfigError::Invalid`] for out-of-range values.
pub fn parse_config(content: &str) -> Result<BridgeConfig, ConfigError> {
    let cfg: BridgeConfig = toml::from_str(content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads the configuration at `path`, or the defaults when `path` is `None`.
///
/// A path that was given explicitly must exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read, plus the errors
/// of [`parse_config`].
pub fn load_config(path: Option<&Path>) -> Result<BridgeConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(BridgeConfig::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_control_links() {
        // Arrange / Act
        let cfg = BridgeConfig::default();

        // Assert
        assert_eq!(cfg.control.request_port, "/dev/ttyUSB0");
        assert_eq!(cfg.control.aux_port, "/dev/ttyUSB1");
        assert_eq!(cfg.control.baud_rate, 115_200);
    }

    #[test]
    fn test_default_outbound_shape() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.control.route_alias, "incoming");
        assert_eq!(cfg.control.live_seconds, 2);
        assert!(cfg.control.product_uid.is_empty());
    }

    #[test]
    fn test_default_aux_subscription_hint_is_buffer_minus_one() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.control.rx_buffer_size, 64);
        assert_eq!(cfg.control.aux_max_bytes(), 63);
        assert_eq!(cfg.control.aux_pacing_ms, 25);
    }

    #[test]
    fn test_default_runtime_timing() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.runtime.idle_delay(), Duration::from_millis(10));
        assert_eq!(cfg.runtime.init_retry_delay(), Duration::from_millis(750));
        assert_eq!(cfg.runtime.log_level, "info");
    }

    #[test]
    fn test_default_has_no_consoles() {
        let cfg = BridgeConfig::default();
        assert!(cfg.consoles.uart_port.is_none());
        assert!(cfg.consoles.usb_port.is_none());
        assert!(!cfg.consoles.stdio);
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let cfg = parse_config("").expect("empty config is valid");
        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn test_partial_table_keeps_other_defaults() {
        // Arrange
        let toml = r#"
            [control]
            product_uid = "com.example.notebox"
            live_seconds = 5

            [consoles]
            usb_port = "/dev/ttyACM0"
        "#;

        // Act
        let cfg = parse_config(toml).expect("valid config");

        // Assert
        assert_eq!(cfg.control.product_uid, "com.example.notebox");
        assert_eq!(cfg.control.live_seconds, 5);
        assert_eq!(cfg.control.route_alias, "incoming");
        assert_eq!(cfg.consoles.usb_port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(cfg.consoles.baud_rate, 115_200);
        assert_eq!(cfg.runtime, RuntimeConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let result = parse_config("[control\nbaud_rate = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_baud_rate_is_rejected() {
        let result = parse_config("[control]\nbaud_rate = 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "control.baud_rate",
                ..
            })
        ));
    }

    #[test]
    fn test_empty_route_alias_is_rejected() {
        let result = parse_config("[control]\nroute_alias = \"  \"\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "control.route_alias",
                ..
            })
        ));
    }

    #[test]
    fn test_tiny_rx_buffer_is_rejected() {
        let result = parse_config("[control]\nrx_buffer_size = 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_without_path_returns_defaults() {
        let cfg = load_config(None).expect("defaults");
        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn test_load_missing_explicit_path_is_io_error() {
        let result = load_config(Some(Path::new("/nonexistent/cardlink/config.toml")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        // Arrange
        let mut cfg = BridgeConfig::default();
        cfg.consoles.uart_port = Some("/dev/ttyAMA0".to_string());
        cfg.runtime.idle_delay_ms = 20;

        // Act
        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored = parse_config(&text).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }
}
