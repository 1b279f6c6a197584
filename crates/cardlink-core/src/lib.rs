//! # cardlink-core
//!
//! Shared library for the cardlink bridge containing the structured-message
//! codec, the line framer, control-module command builders, and the three
//! pieces of protocol state: pending replies, unique ids and the environment
//! snapshot.
//!
//! This crate has zero dependencies on serial ports, threads, or async
//! runtimes.  Everything here can be driven from a unit test.
//!
//! # Architecture overview
//!
//! The bridge sits between a cloud-connected control module and one or more
//! operator consoles.  Every channel speaks newline-terminated JSON objects
//! (or plain text on the console side).
//!
//! - **`protocol`** – How lines become [`StructuredMessage`]s and back, how a
//!   raw byte stream is cut into lines, and how the outbound control-module
//!   verbs (`web.post`, `hub.signal`, setup requests) are shaped.
//!
//! - **`domain`** – The state the bridge keeps between lines: the
//!   fixed-capacity [`PendingReplySet`], the [`UniqueIdGenerator`], and the
//!   [`EnvironmentSnapshot`] mirrored from the control module.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `cardlink_core::StructuredMessage` instead of the full module path.
pub use domain::environment::EnvironmentSnapshot;
pub use domain::ids::UniqueIdGenerator;
pub use domain::pending::{PendingReplySet, Registration, PENDING_CAPACITY};
pub use protocol::codec::{parse, parse_bytes, serialize, trim_line_end, ParseError};
pub use protocol::framing::LineAssembler;
pub use protocol::message::StructuredMessage;
