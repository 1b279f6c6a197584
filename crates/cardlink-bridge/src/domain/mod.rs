//! Domain layer for cardlink-bridge.
//!
//! The protocol state itself (pending replies, ids, environment) lives in
//! `cardlink-core`.  What remains here is the bridge's configuration, which
//! has no dependencies on serial ports or threads.

pub mod config;

pub use config::{
    load_config, parse_config, BridgeConfig, ConfigError, ConsoleConfig, ControlConfig,
    RuntimeConfig,
};
