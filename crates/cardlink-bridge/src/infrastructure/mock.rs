//! In-memory transports for testing.
//!
//! # Why in-memory transports?
//!
//! The real transports need serial hardware (or at least a pty pair) and
//! cannot be observed from test code.  These replacements keep everything in
//! `Arc<Mutex<...>>` fields: a test keeps a clone of each mock, hands the
//! other clone to the [`Bridge`](crate::application::Bridge) as a boxed
//! trait object, and inspects what was written afterwards.
//!
//! ```ignore
//! let uart = MockConsole::new("uart");
//! let mut bridge = Bridge::new(/* ... */).with_console(Box::new(uart.clone()));
//!
//! uart.push_line("status");
//! bridge.poll();
//! assert_eq!(control.sent_commands().len(), 1);
//! ```
//!
//! # Failure flags
//!
//! Each mock has a `set_fail_*` switch to simulate a broken link, so the
//! error paths of the bridge can be tested without a broken device.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cardlink_core::protocol::commands;
use cardlink_core::StructuredMessage;

use crate::application::ports::{
    Console, ControlTransport, LineSource, TimeSource, TransportError,
};

/// Locks `mutex`, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn simulated_failure(port: &str) -> TransportError {
    TransportError::Io {
        port: port.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "simulated failure"),
    }
}

// ── Notification source ───────────────────────────────────────────────────────

/// Queue of aux-channel lines.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationSource {
    lines: Arc<Mutex<VecDeque<Vec<u8>>>>,
    fail_reads: Arc<AtomicBool>,
}

impl MockNotificationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `line` (without its newline) for a later `read_line`.
    pub fn push_line(&self, line: &str) {
        self.push_bytes(line.as_bytes());
    }

    /// Queues a raw line, for input that is not valid UTF-8.
    pub fn push_bytes(&self, line: &[u8]) {
        lock(&self.lines).push_back(line.to_vec());
    }

    /// Lines not yet read.
    pub fn pending(&self) -> usize {
        lock(&self.lines).len()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }
}

impl LineSource for MockNotificationSource {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(simulated_failure("mock-aux"));
        }
        Ok(lock(&self.lines).pop_front())
    }
}

// ── Console ───────────────────────────────────────────────────────────────────

/// Operator console with a scripted input queue and a record of writes.
#[derive(Debug, Clone, Default)]
pub struct MockConsole {
    name: String,
    input: Arc<Mutex<VecDeque<Vec<u8>>>>,
    written: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MockConsole {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Queues a line as if the operator had typed it.
    pub fn push_line(&self, line: &str) {
        lock(&self.input).push_back(line.as_bytes().to_vec());
    }

    /// Every successful `write_text`, in order.
    pub fn written(&self) -> Vec<String> {
        lock(&self.written).clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

impl LineSource for MockConsole {
    fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(lock(&self.input).pop_front())
    }
}

impl Console for MockConsole {
    fn name(&self) -> &str {
        &self.name
    }

    fn write_text(&mut self, text: &str) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(simulated_failure(&self.name));
        }
        lock(&self.written).push(text.to_string());
        Ok(())
    }
}

// ── Control module ────────────────────────────────────────────────────────────

/// Control module that answers requests from a per-verb table and records
/// every command.
///
/// A request for a verb with no scripted response gets an empty `{}`, which
/// the bring-up sequence treats as success.
#[derive(Debug, Clone, Default)]
pub struct MockControlModule {
    responses: Arc<Mutex<HashMap<String, StructuredMessage>>>,
    requests: Arc<Mutex<Vec<StructuredMessage>>>,
    commands: Arc<Mutex<Vec<StructuredMessage>>>,
    fail_requests: Arc<AtomicBool>,
    fail_commands: Arc<AtomicBool>,
}

impl MockControlModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the response to every request for `verb`.
    pub fn respond_to(&self, verb: &str, response: StructuredMessage) {
        lock(&self.responses).insert(verb.to_string(), response);
    }

    /// Requests received, in order (including failed ones).
    pub fn sent_requests(&self) -> Vec<StructuredMessage> {
        lock(&self.requests).clone()
    }

    /// Commands delivered, in order.  Commands sent while failing are not
    /// recorded.
    pub fn sent_commands(&self) -> Vec<StructuredMessage> {
        lock(&self.commands).clone()
    }

    pub fn set_fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::Relaxed);
    }

    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::Relaxed);
    }
}

impl ControlTransport for MockControlModule {
    fn request(&mut self, req: &StructuredMessage) -> Result<StructuredMessage, TransportError> {
        lock(&self.requests).push(req.clone());
        if self.fail_requests.load(Ordering::Relaxed) {
            return Err(simulated_failure("mock-control"));
        }
        let verb = commands::verb(req);
        Ok(lock(&self.responses).get(verb).cloned().unwrap_or_default())
    }

    fn command(&mut self, cmd: &StructuredMessage) -> Result<(), TransportError> {
        if self.fail_commands.load(Ordering::Relaxed) {
            return Err(simulated_failure("mock-control"));
        }
        lock(&self.commands).push(cmd.clone());
        Ok(())
    }
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Time source frozen at one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(Option<u32>);

impl FixedClock {
    /// Always reports `now` as trusted time.
    pub fn trusted(now: u32) -> Self {
        Self(Some(now))
    }

    /// Never reports trusted time.
    pub fn untrusted() -> Self {
        Self(None)
    }
}

impl TimeSource for FixedClock {
    fn trusted_now(&self) -> Option<u32> {
        self.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
