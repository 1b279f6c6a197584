//! The bridge context and its poll loop.
//!
//! [`Bridge`] owns everything the bridge needs between lines: the protocol
//! state ([`BridgeState`]), the control-module transport, the notification
//! channel, the operator consoles, and the time source.  Nothing here is a
//! global; a test can build as many independent bridges as it likes.
//!
//! # One poll, one line per channel
//!
//! ```text
//! poll()
//!   ├── aux channel:  at most one line → router   → text to every console
//!   └── each console: at most one line → composer → web.post / hub.signal
//! ```
//!
//! `poll` never waits for input.  It returns `true` when any channel produced
//! work, so the driver can back off only when the bridge is idle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cardlink_core::{EnvironmentSnapshot, PendingReplySet, UniqueIdGenerator};
use tracing::{debug, info, warn};

use crate::application::composer::{self, OutboundIntent};
use crate::application::ports::{Console, ControlTransport, LineSource, TimeSource};
use crate::application::router;

// ── State ─────────────────────────────────────────────────────────────────────

/// Protocol state carried across lines.
///
/// Router and composer receive this by `&mut`; it is never shared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeState {
    /// Ids awaiting a reply.
    pub pending: PendingReplySet,
    /// Source of fresh correlation ids.
    pub ids: UniqueIdGenerator,
    /// Mirror of the control module's environment variables.
    pub environment: EnvironmentSnapshot,
}

impl BridgeState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// How outbound commands are addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSettings {
    /// Route alias for `web.post`.
    pub route_alias: String,
    /// `seconds` of live posts and signals.
    pub live_seconds: u32,
}

impl Default for OutboundSettings {
    fn default() -> Self {
        Self {
            route_alias: "incoming".to_string(),
            live_seconds: 2,
        }
    }
}

// ── Bridge ────────────────────────────────────────────────────────────────────

/// The owning bridge context.
pub struct Bridge {
    state: BridgeState,
    settings: OutboundSettings,
    control: Box<dyn ControlTransport>,
    notifications: Box<dyn LineSource>,
    consoles: Vec<Box<dyn Console>>,
    clock: Box<dyn TimeSource>,
}

impl Bridge {
    /// Creates a bridge with no consoles attached.
    pub fn new(
        state: BridgeState,
        settings: OutboundSettings,
        control: Box<dyn ControlTransport>,
        notifications: Box<dyn LineSource>,
        clock: Box<dyn TimeSource>,
    ) -> Self {
        Self {
            state,
            settings,
            control,
            notifications,
            consoles: Vec::new(),
            clock,
        }
    }

    /// Attaches an operator console.
    pub fn add_console(&mut self, console: Box<dyn Console>) {
        info!("console attached: {}", console.name());
        self.consoles.push(console);
    }

    /// Builder form of [`add_console`](Self::add_console).
    pub fn with_console(mut self, console: Box<dyn Console>) -> Self {
        self.add_console(console);
        self
    }

    pub fn state(&self) -> &BridgeState {
        &self.state
    }

    pub fn console_count(&self) -> usize {
        self.consoles.len()
    }

    /// Services every channel once.  Returns `true` when anything happened.
    pub fn poll(&mut self) -> bool {
        let mut did_something = self.poll_notifications();
        for index in 0..self.consoles.len() {
            did_something |= self.poll_console(index);
        }
        did_something
    }

    /// Polls until `running` is cleared, sleeping `idle_delay` after every
    /// poll that found nothing to do.
    pub fn run(&mut self, running: &AtomicBool, idle_delay: Duration) {
        info!("bridge running with {} console(s)", self.consoles.len());
        while running.load(Ordering::Relaxed) {
            if !self.poll() {
                std::thread::sleep(idle_delay);
            }
        }
        info!("bridge stopped");
    }

    // ── Channels ──────────────────────────────────────────────────────────────

    /// One aux-channel line.  Only a line that parses counts as work.
    fn poll_notifications(&mut self) -> bool {
        let line = match self.notifications.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => return false,
            Err(e) => {
                warn!("notification channel read failed: {e}");
                return false;
            }
        };
        let now = self.clock.trusted_now();
        let Some(routed) = router::route(&line, &mut self.state, now) else {
            return false;
        };
        if let Some(text) = routed.console_text() {
            self.broadcast(&text);
        }
        true
    }

    /// One line from console `index`.  Any complete line counts as work,
    /// even a blank one.
    fn poll_console(&mut self, index: usize) -> bool {
        let line = match self.consoles[index].read_line() {
            Ok(Some(line)) => line,
            Ok(None) => return false,
            Err(e) => {
                warn!("console {} read failed: {e}", self.consoles[index].name());
                return false;
            }
        };
        let text = String::from_utf8_lossy(&line);
        let now = self.clock.trusted_now();
        if let Some(intent) = composer::compose(&text, &mut self.state, now) {
            self.send(intent);
        }
        true
    }

    // ── Output ────────────────────────────────────────────────────────────────

    fn broadcast(&mut self, text: &str) {
        for console in &mut self.consoles {
            if let Err(e) = console.write_text(text) {
                warn!("write to console {} failed: {e}", console.name());
            }
        }
    }

    /// Sends an operator message upstream.  Failures are logged and the
    /// message is dropped.
    fn send(&mut self, intent: OutboundIntent) {
        let is_reply = intent.is_reply();
        let id = intent.body().id();
        let cmd = intent.into_command(&self.settings.route_alias, self.settings.live_seconds);
        match self.control.command(&cmd) {
            Ok(()) if is_reply => debug!("reply {id} signalled"),
            Ok(()) => debug!("request {id} posted to {}", self.settings.route_alias),
            Err(e) if is_reply => warn!("signal send failure: {e}"),
            Err(e) => warn!("web request failure: {e}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
