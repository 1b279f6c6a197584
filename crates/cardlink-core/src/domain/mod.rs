//! Domain state kept by the bridge between lines.
//!
//! This module contains pure state machines with no I/O.  Each type is owned
//! by exactly one bridge context and mutated through `&mut self`; none of
//! them is a process-wide singleton.

/// Fixed-capacity set of message ids awaiting a reply.
pub mod pending;

/// Monotonic id generator with a trusted-clock fast path.
pub mod ids;

/// Mirror of the control module's environment variables.
pub mod environment;
