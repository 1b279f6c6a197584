//! Infrastructure layer for cardlink-bridge.
//!
//! The infrastructure layer handles all I/O behind the traits of
//! [`application::ports`](crate::application::ports).
//!
//! # Responsibilities
//!
//! - Opening serial ports and reading them without blocking ([`serial`])
//! - Exchanging requests and responses with the control module
//!   ([`control_module`])
//! - Running stdin on a reader thread ([`stdio`])
//! - Providing trusted time ([`clock`])
//! - In-memory stand-ins for all of the above ([`mock`])
//!
//! # What does NOT belong here?
//!
//! - Routing or reply correlation (that is the application layer)
//! - Config file parsing (that is the domain layer)

pub mod clock;
pub mod control_module;
pub mod mock;
pub mod serial;
pub mod stdio;

pub use clock::SyncedClock;
pub use control_module::SerialControlModule;
pub use serial::SerialLinePort;
pub use stdio::StdioConsole;
