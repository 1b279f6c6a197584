//! Request/command link to the control module.
//!
//! Outbound traffic is one JSON object per line.  A `cmd` is written and
//! forgotten.  A `req` is written and then the link is read until one
//! complete response line arrives or the timeout expires.
//!
//! The link is generic over any `Read + Write` so tests can drive it with an
//! in-memory duplex; production uses a `Box<dyn SerialPort>` whose short
//! read timeout lets the deadline be checked between reads.

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use cardlink_core::protocol::commands;
use cardlink_core::{parse_bytes, serialize, trim_line_end, LineAssembler, StructuredMessage};
use serialport::SerialPort;
use tracing::{debug, info};

use crate::application::ports::{ControlTransport, TransportError};
use crate::infrastructure::serial::open_port;

/// Per-read wait while a request is outstanding.
const RESPONSE_POLL: Duration = Duration::from_millis(20);

/// Line-oriented control-module link.
pub struct SerialControlModule<P = Box<dyn SerialPort>> {
    path: String,
    port: P,
    lines: LineAssembler,
    timeout: Duration,
}

impl SerialControlModule {
    /// Opens the request link at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serial`] when the port cannot be opened or
    /// configured.
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, TransportError> {
        let mut port = open_port(path, baud_rate)?;
        port.set_timeout(RESPONSE_POLL)
            .map_err(|source| TransportError::Serial {
                port: path.to_string(),
                source,
            })?;
        info!("control: opened {path} at {baud_rate} baud");
        Ok(Self::with_port(path, port, timeout))
    }
}

impl<P: Read + Write + Send> SerialControlModule<P> {
    /// Wraps an already-open port.
    pub fn with_port(path: &str, port: P, timeout: Duration) -> Self {
        Self {
            path: path.to_string(),
            port,
            lines: LineAssembler::new(),
            timeout,
        }
    }

    fn io_error(&self, source: std::io::Error) -> TransportError {
        TransportError::Io {
            port: self.path.clone(),
            source,
        }
    }

    fn write_message(&mut self, msg: &StructuredMessage) -> Result<(), TransportError> {
        let mut line = serialize(msg);
        line.push('\n');
        let result = self
            .port
            .write_all(line.as_bytes())
            .and_then(|()| self.port.flush());
        result.map_err(|e| self.io_error(e))
    }

    /// Reads until one non-blank line arrives or the deadline passes.
    fn read_response(&mut self, verb: &str) -> Result<StructuredMessage, TransportError> {
        let deadline = Instant::now() + self.timeout;
        let mut buf = [0u8; 256];
        loop {
            while let Some(line) = self.lines.next_line() {
                let blank = std::str::from_utf8(&line)
                    .map(|text| trim_line_end(text).trim().is_empty())
                    .unwrap_or(false);
                if blank {
                    continue;
                }
                return parse_bytes(&line).map_err(|source| TransportError::Malformed {
                    verb: verb.to_string(),
                    source,
                });
            }
            if Instant::now() >= deadline {
                return Err(TransportError::Timeout {
                    verb: verb.to_string(),
                    timeout: self.timeout,
                });
            }
            match self.port.read(&mut buf) {
                Ok(0) => std::thread::sleep(Duration::from_millis(1)),
                Ok(n) => self.lines.push(&buf[..n]),
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
                Err(e) => return Err(self.io_error(e)),
            }
        }
    }
}

impl<P: Read + Write + Send> ControlTransport for SerialControlModule<P> {
    fn request(&mut self, req: &StructuredMessage) -> Result<StructuredMessage, TransportError> {
        let verb = commands::verb(req).to_string();
        // A response that arrived after an earlier timeout must not be taken
        // as the answer to this request.
        self.lines.clear();
        self.write_message(req)?;
        let rsp = self.read_response(&verb)?;
        debug!("{verb} answered");
        Ok(rsp)
    }

    fn command(&mut self, cmd: &StructuredMessage) -> Result<(), TransportError> {
        self.write_message(cmd)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
