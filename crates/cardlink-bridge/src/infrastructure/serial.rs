//! Serial-port line transport.
//!
//! [`SerialLinePort`] serves both the control module's aux (notification)
//! link and the UART/USB operator consoles.  Reads never block: each call
//! asks the driver how many bytes are already waiting, reads exactly those,
//! and hands them to a [`LineAssembler`].  A line whose `\n` has not arrived
//! yet stays buffered until a later poll completes it.

use std::io::{Read, Write};
use std::time::Duration;

use cardlink_core::LineAssembler;
use serialport::SerialPort;
use tracing::info;

use crate::application::ports::{Console, LineSource, TransportError};

/// Upper bound on one driver read.
const READ_CHUNK: usize = 1024;

/// Bound on a blocking write to a stalled port.
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Opens `path` at `baud_rate` with 8N1 framing.
///
/// # Errors
///
/// Returns [`TransportError::Serial`] when the port cannot be opened.
pub fn open_port(path: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, TransportError> {
    serialport::new(path, baud_rate)
        .timeout(WRITE_TIMEOUT)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(serialport::Parity::None)
        .open()
        .map_err(|source| TransportError::Serial {
            port: path.to_string(),
            source,
        })
}

/// A serial port read as newline-terminated lines.
pub struct SerialLinePort {
    name: String,
    path: String,
    port: Box<dyn SerialPort>,
    lines: LineAssembler,
}

impl SerialLinePort {
    /// Opens `path` and labels it `name` in log lines.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serial`] when the port cannot be opened.
    pub fn open(name: &str, path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = open_port(path, baud_rate)?;
        info!("{name}: opened {path} at {baud_rate} baud");
        Ok(Self {
            name: name.to_string(),
            path: path.to_string(),
            port,
            lines: LineAssembler::new(),
        })
    }

    /// Moves whatever the driver already holds into the assembler.
    fn fill(&mut self) -> Result<(), TransportError> {
        let available = self
            .port
            .bytes_to_read()
            .map_err(|source| TransportError::Serial {
                port: self.path.clone(),
                source,
            })? as usize;
        if available == 0 {
            return Ok(());
        }
        let mut buf = vec![0u8; available.min(READ_CHUNK)];
        match self.port.read(&mut buf) {
            Ok(n) => {
                self.lines.push(&buf[..n]);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(()),
            Err(source) => Err(TransportError::Io {
                port: self.path.clone(),
                source,
            }),
        }
    }
}

impl LineSource for SerialLinePort {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(line) = self.lines.next_line() {
            return Ok(Some(line));
        }
        self.fill()?;
        Ok(self.lines.next_line())
    }
}

impl Console for SerialLinePort {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.port
            .write_all(text.as_bytes())
            .and_then(|()| self.port.flush())
            .map_err(|source| TransportError::Io {
                port: self.path.clone(),
                source,
            })
    }
}
