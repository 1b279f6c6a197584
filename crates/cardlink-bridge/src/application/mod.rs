//! Application layer for cardlink-bridge.
//!
//! The application layer knows *what* happens to each line, and delegates
//! *how* bytes move to the infrastructure layer through the traits in
//! [`ports`].
//!
//! # Responsibilities
//!
//! - Classifying control-module notifications ([`router`])
//! - Turning operator input into outbound commands ([`composer`])
//! - Bringing the control module up at startup ([`setup`])
//! - Owning the protocol state and polling every channel ([`bridge_service`])
//!
//! # What does NOT belong here?
//!
//! - Opening serial ports or spawning threads (that is infrastructure)
//! - Config file parsing (that is the domain layer and `main.rs`)

pub mod bridge_service;
pub mod composer;
pub mod ports;
pub mod router;
pub mod setup;

pub use bridge_service::{Bridge, BridgeState, OutboundSettings};
pub use composer::{compose, OutboundIntent};
pub use ports::{Console, ControlTransport, LineSource, TimeSource, TransportError};
pub use router::{route, Routed};
pub use setup::{bring_up, refresh_environment, sync_clock, Capabilities, SetupError, SetupOptions};
