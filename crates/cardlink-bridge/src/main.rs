//! cardlink bridge: entry point.
//!
//! Connects a cloud-connected control module to one or more operator
//! consoles.  Notifications from the control module are shown on every
//! console; operator lines go back upstream as replies or new requests.
//!
//! # Usage
//!
//! ```text
//! cardlink-bridge [OPTIONS]
//!
//! Options:
//!   --config       <PATH>  TOML config file (every key optional)
//!   --request-port <PATH>  Control-module request link
//!   --aux-port     <PATH>  Control-module notification link
//!   --uart-port    <PATH>  UART operator console
//!   --usb-port     <PATH>  USB operator console
//!   --stdio                Use stdin/stdout as an operator console
//!   --product-uid  <UID>   Product sent with hub.set
//!   --route-alias  <NAME>  Route for operator requests
//!   --log-level    <LVL>   Log filter when RUST_LOG is unset
//! ```
//!
//! # Environment variable overrides
//!
//! Every option can also be given as an environment variable.  CLI args take
//! precedence, and both take precedence over the config file.
//!
//! | Variable                 | Option           |
//! |--------------------------|------------------|
//! | `CARDLINK_CONFIG`        | `--config`       |
//! | `CARDLINK_REQUEST_PORT`  | `--request-port` |
//! | `CARDLINK_AUX_PORT`      | `--aux-port`     |
//! | `CARDLINK_UART_PORT`     | `--uart-port`    |
//! | `CARDLINK_USB_PORT`      | `--usb-port`     |
//! | `CARDLINK_STDIO`         | `--stdio`        |
//! | `CARDLINK_PRODUCT_UID`   | `--product-uid`  |
//! | `CARDLINK_ROUTE_ALIAS`   | `--route-alias`  |
//! | `CARDLINK_LOG_LEVEL`     | `--log-level`    |
//!
//! # Startup
//!
//! 1. Config is loaded and overridden, logging is initialised.
//! 2. All serial ports are opened (fatal on failure).
//! 3. The control module is brought up, retrying until it answers.
//! 4. The environment is loaded and the clock synced (best effort).
//! 5. The bridge polls on a blocking thread until Ctrl+C.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cardlink_bridge::application::{
    bring_up, refresh_environment, setup::BRIDGE_VERSION, sync_clock, Bridge, BridgeState,
    OutboundSettings, SetupOptions,
};
use cardlink_bridge::domain::{load_config, BridgeConfig};
use cardlink_bridge::infrastructure::{
    SerialControlModule, SerialLinePort, StdioConsole, SyncedClock,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Control-module notification router and reply correlator.
#[derive(Debug, Parser)]
#[command(
    name = "cardlink-bridge",
    about = "Routes control-module notifications to operator consoles and correlates replies",
    version
)]
struct Cli {
    /// TOML config file.  Without it every setting has its default.
    #[arg(long, env = "CARDLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port of the control module's request link.
    #[arg(long, env = "CARDLINK_REQUEST_PORT")]
    request_port: Option<String>,

    /// Serial port of the control module's notification link.
    #[arg(long, env = "CARDLINK_AUX_PORT")]
    aux_port: Option<String>,

    /// Serial port of the UART operator console.
    #[arg(long, env = "CARDLINK_UART_PORT")]
    uart_port: Option<String>,

    /// Serial port of the USB operator console.
    #[arg(long, env = "CARDLINK_USB_PORT")]
    usb_port: Option<String>,

    /// Attach stdin/stdout as an operator console.
    #[arg(long, env = "CARDLINK_STDIO")]
    stdio: bool,

    /// Product identifier sent with `hub.set`.
    #[arg(long, env = "CARDLINK_PRODUCT_UID")]
    product_uid: Option<String>,

    /// Route alias for operator requests.
    #[arg(long, env = "CARDLINK_ROUTE_ALIAS")]
    route_alias: Option<String>,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[arg(long, env = "CARDLINK_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file (if any) and applies the CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or if
    /// the overridden config fails validation.
    fn into_bridge_config(self) -> anyhow::Result<BridgeConfig> {
        let mut cfg = load_config(self.config.as_deref()).with_context(|| {
            format!(
                "loading config{}",
                self.config
                    .as_ref()
                    .map(|p| format!(" from {}", p.display()))
                    .unwrap_or_default()
            )
        })?;

        if let Some(port) = self.request_port {
            cfg.control.request_port = port;
        }
        if let Some(port) = self.aux_port {
            cfg.control.aux_port = port;
        }
        if let Some(port) = self.uart_port {
            cfg.consoles.uart_port = Some(port);
        }
        if let Some(port) = self.usb_port {
            cfg.consoles.usb_port = Some(port);
        }
        if self.stdio {
            cfg.consoles.stdio = true;
        }
        if let Some(uid) = self.product_uid {
            cfg.control.product_uid = uid;
        }
        if let Some(route) = self.route_alias {
            cfg.control.route_alias = route;
        }
        if let Some(level) = self.log_level {
            cfg.runtime.log_level = level;
        }

        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// The bridge itself is synchronous: serial I/O is polled, never awaited.
/// Tokio provides the Ctrl+C listener and a blocking-pool thread for the
/// driver loop, so shutdown is a flag the loop checks between polls.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Cli::parse().into_bridge_config()?;

    // `RUST_LOG` wins; otherwise the configured level applies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.runtime.log_level)),
        )
        .init();

    info!(
        "{BRIDGE_VERSION} starting: request={}, aux={}",
        cfg.control.request_port, cfg.control.aux_port
    );

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    // ── Driver ────────────────────────────────────────────────────────────────
    tokio::task::spawn_blocking(move || run(cfg, &running))
        .await
        .context("bridge driver thread panicked")??;

    info!("cardlink bridge stopped");
    Ok(())
}

/// Opens every port, brings the control module up and polls until shutdown.
fn run(cfg: BridgeConfig, running: &AtomicBool) -> anyhow::Result<()> {
    let control_cfg = &cfg.control;

    let mut control = SerialControlModule::open(
        &control_cfg.request_port,
        control_cfg.baud_rate,
        control_cfg.request_timeout(),
    )
    .context("opening control-module request link")?;
    let aux = SerialLinePort::open("aux", &control_cfg.aux_port, control_cfg.baud_rate)
        .context("opening control-module notification link")?;

    // ── Bring-up, retried until the control module answers ───────────────────
    let opts = SetupOptions {
        product_uid: control_cfg.product_uid.clone(),
        version: BRIDGE_VERSION.to_string(),
        aux_max_bytes: control_cfg.aux_max_bytes(),
        aux_pacing_ms: control_cfg.aux_pacing_ms,
    };
    loop {
        if !running.load(Ordering::Relaxed) {
            return Ok(());
        }
        match bring_up(&mut control, &opts) {
            Ok(_) => break,
            Err(e) => {
                warn!("{e}; retrying in {:?}", cfg.runtime.init_retry_delay());
                std::thread::sleep(cfg.runtime.init_retry_delay());
            }
        }
    }
    info!("control module ready");

    let mut state = BridgeState::new();
    refresh_environment(&mut control, &mut state.environment);
    let clock = SyncedClock::from_sync(sync_clock(&mut control));
    if !clock.is_synced() {
        info!("no trusted time; ids come from the fallback counter");
    }

    let mut bridge = Bridge::new(
        state,
        OutboundSettings {
            route_alias: control_cfg.route_alias.clone(),
            live_seconds: control_cfg.live_seconds,
        },
        Box::new(control),
        Box::new(aux),
        Box::new(clock),
    );

    // ── Consoles ──────────────────────────────────────────────────────────────
    let consoles = [("uart", &cfg.consoles.uart_port), ("usb", &cfg.consoles.usb_port)];
    for (name, port) in consoles {
        if let Some(path) = port {
            let console = SerialLinePort::open(name, path, cfg.consoles.baud_rate)
                .with_context(|| format!("opening {name} console"))?;
            bridge.add_console(Box::new(console));
        }
    }
    if cfg.consoles.stdio {
        bridge.add_console(Box::new(
            StdioConsole::spawn().context("starting stdio console")?,
        ));
    }
    if bridge.console_count() == 0 {
        warn!("no operator console configured; notifications will only be logged");
    }

    bridge.run(running, cfg.runtime.idle_delay());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_without_arguments_yields_defaults() {
        // Arrange: parse with no arguments (all defaults apply)
        let cli = Cli::parse_from(["cardlink-bridge"]);

        // Act
        let cfg = cli.into_bridge_config().expect("defaults are valid");

        // Assert
        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn test_cli_port_overrides() {
        let cli = Cli::parse_from([
            "cardlink-bridge",
            "--request-port",
            "/dev/ttyS0",
            "--aux-port",
            "/dev/ttyS1",
            "--usb-port",
            "/dev/ttyACM0",
        ]);

        let cfg = cli.into_bridge_config().expect("valid");

        assert_eq!(cfg.control.request_port, "/dev/ttyS0");
        assert_eq!(cfg.control.aux_port, "/dev/ttyS1");
        assert_eq!(cfg.consoles.usb_port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(cfg.consoles.uart_port, None);
    }

    #[test]
    fn test_cli_stdio_flag() {
        let cli = Cli::parse_from(["cardlink-bridge", "--stdio"]);
        let cfg = cli.into_bridge_config().expect("valid");
        assert!(cfg.consoles.stdio);
    }

    #[test]
    fn test_cli_outbound_overrides() {
        let cli = Cli::parse_from([
            "cardlink-bridge",
            "--product-uid",
            "com.example.box",
            "--route-alias",
            "ops",
            "--log-level",
            "debug",
        ]);

        let cfg = cli.into_bridge_config().expect("valid");

        assert_eq!(cfg.control.product_uid, "com.example.box");
        assert_eq!(cfg.control.route_alias, "ops");
        assert_eq!(cfg.runtime.log_level, "debug");
    }

    #[test]
    fn test_cli_blank_route_alias_is_rejected() {
        // Arrange
        let cli = Cli::parse_from(["cardlink-bridge", "--route-alias", " "]);

        // Act
        let result = cli.into_bridge_config();

        // Assert: must return an error, not panic
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_missing_config_file_is_an_error() {
        let cli = Cli::parse_from([
            "cardlink-bridge",
            "--config",
            "/nonexistent/cardlink.toml",
        ]);
        assert!(cli.into_bridge_config().is_err());
    }
}
