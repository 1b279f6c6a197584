//! Traits at the bridge's I/O seams.
//!
//! The application layer never touches a serial port directly.  It talks to
//! these traits, and the infrastructure layer supplies the implementations:
//!
//! | Trait                | Production                    | Tests                      |
//! |----------------------|-------------------------------|----------------------------|
//! | [`LineSource`]       | `SerialLinePort` (aux link)   | `MockNotificationSource`   |
//! | [`Console`]          | `SerialLinePort`, `StdioConsole` | `MockConsole`        |
//! | [`ControlTransport`] | `SerialControlModule`         | `MockControlModule`, `MockControlTransport` |
//! | [`TimeSource`]       | `SyncedClock`                 | `FixedClock`               |
//!
//! Every read is non-blocking: "nothing yet" is `Ok(None)`, never a wait.

use std::time::Duration;

use cardlink_core::{ParseError, StructuredMessage};
use thiserror::Error;

/// Failures of the transports behind the ports.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying device reported an I/O error.
    #[error("I/O error on {port}: {source}")]
    Io {
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// The serial port could not be opened or configured.
    #[error("serial port {port}: {source}")]
    Serial {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// No response line arrived in time.
    #[error("no response to {verb} within {timeout:?}")]
    Timeout { verb: String, timeout: Duration },

    /// A response arrived but was not a structured message.
    #[error("malformed response to {verb}: {source}")]
    Malformed {
        verb: String,
        #[source]
        source: ParseError,
    },

    /// The control module answered with a non-empty `err`.
    #[error("{verb} rejected: {reason}")]
    Rejected { verb: String, reason: String },

    /// The other end went away (reader thread exited, pipe closed).
    #[error("{0} is closed")]
    Closed(String),
}

/// A non-blocking source of newline-terminated lines.
pub trait LineSource: Send {
    /// Returns the next complete line without its `\n`, or `Ok(None)` when no
    /// complete line is available yet.  Never blocks waiting for input.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// A bidirectional operator console.
pub trait Console: LineSource {
    /// Short name used in log lines (`"uart"`, `"usb"`, `"stdio"`).
    fn name(&self) -> &str;

    /// Writes `text` as-is; the caller supplies the trailing `\n`.
    fn write_text(&mut self, text: &str) -> Result<(), TransportError>;
}

/// Request/command link to the control module.
#[cfg_attr(test, mockall::automock)]
pub trait ControlTransport: Send {
    /// Sends a `req` and waits (bounded) for its single response line.
    ///
    /// The response is returned as received; a non-empty `err` in it is the
    /// caller's to interpret.
    fn request(&mut self, req: &StructuredMessage) -> Result<StructuredMessage, TransportError>;

    /// Sends a fire-and-forget `cmd`.
    fn command(&mut self, cmd: &StructuredMessage) -> Result<(), TransportError>;
}

/// Source of trusted wall-clock time for id generation.
pub trait TimeSource: Send {
    /// Current Unix time in seconds, or `None` when no trusted time is known.
    fn trusted_now(&self) -> Option<u32>;
}
