//! One-time control-module bring-up and the startup queries.
//!
//! Before the bridge can route anything, the control module has to be put
//! into a known state and its aux channel subscribed to notifications.
//! [`bring_up`] sends the sequence in order and stops at the first failure;
//! the caller retries the whole sequence after a delay.
//!
//! [`refresh_environment`] and [`sync_clock`] are best-effort queries: when
//! the control module cannot answer, the bridge simply runs without an
//! update.

use cardlink_core::protocol::commands;
use cardlink_core::{EnvironmentSnapshot, StructuredMessage};
use thiserror::Error;
use tracing::{debug, info};

use crate::application::ports::{ControlTransport, TransportError};

/// Version string reported with `dfu.status`.
pub const BRIDGE_VERSION: &str = concat!("cardlink-v", env!("CARGO_PKG_VERSION_MAJOR"));

/// A bring-up step failed.
#[derive(Debug, Error)]
#[error("{step}: {source}")]
pub struct SetupError {
    /// Human-readable name of the step that failed.
    pub step: &'static str,
    #[source]
    pub source: TransportError,
}

/// Settings that shape the bring-up requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOptions {
    /// Product identifier for `hub.set`; empty to leave it unchanged.
    pub product_uid: String,
    /// Version reported with `dfu.status`.
    pub version: String,
    /// `max` of the aux subscription.
    pub aux_max_bytes: u32,
    /// `ms` of the aux subscription.
    pub aux_pacing_ms: u32,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            product_uid: String::new(),
            version: BRIDGE_VERSION.to_string(),
            aux_max_bytes: 63,
            aux_pacing_ms: 25,
        }
    }
}

/// Radio and positioning features reported by `card.version`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub gps: bool,
    pub cellular: bool,
    pub wifi: bool,
    pub ntn: bool,
    pub lora: bool,
}

impl Capabilities {
    fn from_version(rsp: &StructuredMessage) -> Self {
        Self {
            gps: rsp.get_bool("gps"),
            cellular: rsp.get_bool("cell"),
            wifi: rsp.get_bool("wifi"),
            ntn: rsp.get_bool("ntn"),
            lora: rsp.get_bool("lora"),
        }
    }
}

/// Sends `req` and fails on a transport error or a non-empty `err`.
fn transact(
    ctl: &mut dyn ControlTransport,
    req: &StructuredMessage,
) -> Result<StructuredMessage, TransportError> {
    let rsp = ctl.request(req)?;
    if let Some(reason) = commands::response_error(&rsp) {
        return Err(TransportError::Rejected {
            verb: commands::verb(req).to_string(),
            reason: reason.to_string(),
        });
    }
    Ok(rsp)
}

fn step(
    ctl: &mut dyn ControlTransport,
    step: &'static str,
    req: StructuredMessage,
) -> Result<StructuredMessage, SetupError> {
    transact(ctl, &req).map_err(|source| SetupError { step, source })
}

/// Runs the bring-up sequence once.
///
/// The aux subscription is sent last; until it succeeds no notifications
/// arrive, so a failed attempt leaves nothing half-routed.
///
/// # Errors
///
/// Returns the first failing step.
pub fn bring_up(
    ctl: &mut dyn ControlTransport,
    opts: &SetupOptions,
) -> Result<Capabilities, SetupError> {
    step(ctl, "control module not responding", commands::hub_set(&opts.product_uid))?;
    step(ctl, "cannot report version", commands::dfu_status(&opts.version))?;
    step(ctl, "cannot set aux mode", commands::card_aux_default())?;
    step(ctl, "cannot set battery type", commands::card_voltage_lipo())?;
    let version = step(ctl, "cannot obtain capabilities", commands::card_version())?;
    let caps = Capabilities::from_version(&version);
    info!(
        "control module capabilities: gps={} cell={} wifi={} ntn={} lora={}",
        caps.gps, caps.cellular, caps.wifi, caps.ntn, caps.lora
    );
    step(
        ctl,
        "cannot subscribe to notifications",
        commands::aux_serial_subscribe(opts.aux_max_bytes, opts.aux_pacing_ms),
    )?;
    Ok(caps)
}

/// Reloads every environment variable.
///
/// Returns the new modification time, or `None` when the control module
/// could not answer (the snapshot is left untouched).
pub fn refresh_environment(
    ctl: &mut dyn ControlTransport,
    env: &mut EnvironmentSnapshot,
) -> Option<i64> {
    let rsp = match transact(ctl, &commands::env_get()) {
        Ok(rsp) => rsp,
        Err(e) => {
            debug!("environment unavailable: {e}");
            return None;
        }
    };
    let modified = rsp.get_i64("time");
    env.apply(modified, rsp.body());
    info!("environment loaded: {} variables, modified {modified}", env.len());
    Some(modified)
}

/// Reads the control module's clock.
///
/// Returns the Unix time in seconds, or `None` when the clock is unset or
/// unreachable.
pub fn sync_clock(ctl: &mut dyn ControlTransport) -> Option<u32> {
    match transact(ctl, &commands::card_time()) {
        Ok(rsp) => match u32::try_from(rsp.get_i64("time")) {
            Ok(0) | Err(_) => {
                debug!("control module clock not set");
                None
            }
            Ok(time) => Some(time),
        },
        Err(e) => {
            debug!("control module clock unavailable: {e}");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
