//! Console on the process's own stdin/stdout.
//!
//! Standard input has no portable non-blocking read, so a dedicated reader
//! thread blocks on it and forwards each line through an `mpsc` channel.
//! The bridge side only ever calls `try_recv`, which keeps `poll` from
//! waiting on the terminal.
//!
//! When stdin reaches end of file (for example input piped from a file) the
//! thread exits and the console goes quiet; output keeps working.

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{info, warn};

use crate::application::ports::{Console, LineSource, TransportError};

const NAME: &str = "stdio";

/// stdin/stdout operator console.
pub struct StdioConsole {
    lines: Receiver<Vec<u8>>,
    closed: bool,
}

impl StdioConsole {
    /// Starts the stdin reader thread.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] when the thread cannot be spawned.
    pub fn spawn() -> Result<Self, TransportError> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        thread::Builder::new()
            .name("cardlink-stdin".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                let mut reader = stdin.lock();
                let mut line = Vec::new();
                loop {
                    line.clear();
                    match reader.read_until(b'\n', &mut line) {
                        Ok(0) => break,
                        Ok(_) => {
                            if line.last() == Some(&b'\n') {
                                line.pop();
                            }
                            // The bridge is gone; nothing left to feed.
                            if tx.send(line.clone()).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("stdin read failed: {e}");
                            break;
                        }
                    }
                }
            })
            .map_err(|source| TransportError::Io {
                port: NAME.to_string(),
                source,
            })?;
        Ok(Self {
            lines: rx,
            closed: false,
        })
    }
}

impl LineSource for StdioConsole {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.closed {
            return Ok(None);
        }
        match self.lines.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                info!("stdin closed; stdio console is output-only from now on");
                self.closed = true;
                Ok(None)
            }
        }
    }
}

impl Console for StdioConsole {
    fn name(&self) -> &str {
        NAME
    }

    fn write_text(&mut self, text: &str) -> Result<(), TransportError> {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        out.write_all(text.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|source| TransportError::Io {
                port: NAME.to_string(),
                source,
            })
    }
}
