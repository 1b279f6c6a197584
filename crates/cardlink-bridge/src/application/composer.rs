//! Outbound message composer.
//!
//! Turns one line of operator input into the message the control module
//! should send upstream.  The only decision is *reply or new request*:
//!
//! 1. Trailing control characters are trimmed; a blank line is a no-op.
//! 2. A line starting with `{` that parses as a structured message whose
//!    `id` is pending in the tracker is a **reply**.  The id is claimed.
//! 3. Any other structured message is a **new request**, sent unchanged.
//! 4. Anything else is plain text: it is wrapped as
//!    `{"id":<fresh>,"class":"log","message":<line>}`, the fresh id is
//!    registered so the answer can be matched later, and it is a **new
//!    request**.
//!
//! [`OutboundIntent::into_command`] then wraps the body in the right
//! control-module verb.

use cardlink_core::protocol::commands;
use cardlink_core::protocol::message::keys;
use cardlink_core::{parse, trim_line_end, StructuredMessage};
use tracing::debug;

use crate::application::bridge_service::BridgeState;

/// Class given to plain-text operator lines.
const CLASS_LOG: &str = "log";

/// The composer's decision for one operator line.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundIntent {
    /// Answers a message previously relayed to the operator.
    Reply(StructuredMessage),
    /// Starts a new exchange with the cloud.
    NewRequest(StructuredMessage),
}

impl OutboundIntent {
    /// The structured body that will be sent.
    pub fn body(&self) -> &StructuredMessage {
        match self {
            OutboundIntent::Reply(body) | OutboundIntent::NewRequest(body) => body,
        }
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, OutboundIntent::Reply(_))
    }

    /// Wraps the body in its control-module command.
    ///
    /// A reply becomes a short-lived `hub.signal`; a new request becomes a
    /// `web.post` to `route`.  Both live for `live_seconds`.
    pub fn into_command(self, route: &str, live_seconds: u32) -> StructuredMessage {
        match self {
            OutboundIntent::Reply(body) => commands::hub_signal(body, live_seconds),
            OutboundIntent::NewRequest(body) => commands::web_post(body, route, live_seconds),
        }
    }
}

/// Decides what one operator line becomes.
///
/// Returns `None` for a line that is empty or whitespace after trimming.
/// Mutates `state` only by claiming a replied-to id or by issuing and
/// registering a fresh id for plain text.
pub fn compose(
    line: &str,
    state: &mut BridgeState,
    trusted_now: Option<u32>,
) -> Option<OutboundIntent> {
    let line = trim_line_end(line);
    if line.trim().is_empty() {
        return None;
    }

    if line.starts_with('{') {
        match parse(line) {
            Ok(body) => {
                let id = body.id();
                if state.pending.claim(id) {
                    debug!("operator line answers pending id {id}");
                    return Some(OutboundIntent::Reply(body));
                }
                return Some(OutboundIntent::NewRequest(body));
            }
            Err(e) => debug!("operator line is not a structured message ({e}), sending as text"),
        }
    }

    let id = state.ids.next(trusted_now);
    let body = StructuredMessage::new()
        .with(keys::ID, id)
        .with(keys::CLASS, CLASS_LOG)
        .with(keys::MESSAGE, line);
    state.pending.register(id);
    Some(OutboundIntent::NewRequest(body))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_becomes_registered_new_request() {
        // Arrange
        let mut state = BridgeState::new();

        // Act
        let intent = compose("status", &mut state, Some(1_700_000_000)).expect("not blank");

        // Assert
        assert!(!intent.is_reply());
        let body = intent.body();
        assert_eq!(body.class(), "log");
        assert_eq!(body.message(), "status");
        assert_eq!(body.id(), 1_700_000_000);
        assert!(state.pending.contains(1_700_000_000));
    }

    #[test]
    fn test_plain_text_without_clock_still_gets_nonzero_id() {
        let mut state = BridgeState::new();

        let intent = compose("hello", &mut state, None).expect("not blank");

        assert_ne!(intent.body().id(), 0);
        assert!(state.pending.contains(intent.body().id()));
    }

    #[test]
    fn test_structured_line_with_pending_id_is_reply() {
        // Arrange
        let mut state = BridgeState::new();
        state.pending.register(42);

        // Act
        let intent = compose(r#"{"id":42,"answer":"yes"}"#, &mut state, None).expect("not blank");

        // Assert
        assert!(intent.is_reply());
        assert_eq!(intent.body().get_str("answer"), "yes");
        assert!(!state.pending.contains(42));
    }

    #[test]
    fn test_structured_line_with_unknown_id_is_new_request_unchanged() {
        let mut state = BridgeState::new();
        let line = r#"{"id":43,"class":"cmd","message":"reboot"}"#;

        let intent = compose(line, &mut state, None).expect("not blank");

        assert_eq!(
            intent,
            OutboundIntent::NewRequest(parse(line).expect("valid"))
        );
        assert!(state.pending.is_empty(), "structured requests are not registered");
        assert_eq!(state.ids.last_issued(), 0, "no id is consumed");
    }

    #[test]
    fn test_structured_line_without_id_is_new_request() {
        let mut state = BridgeState::new();
        let intent = compose(r#"{"class":"cmd"}"#, &mut state, None).expect("not blank");
        assert!(!intent.is_reply());
        assert_eq!(intent.body().id(), 0);
    }

    #[test]
    fn test_malformed_structured_line_falls_back_to_text() {
        let mut state = BridgeState::new();

        let intent = compose("{not json", &mut state, None).expect("not blank");

        assert_eq!(intent.body().message(), "{not json");
        assert_eq!(intent.body().class(), "log");
    }

    #[test]
    fn test_trailing_control_characters_are_trimmed() {
        let mut state = BridgeState::new();
        let intent = compose("status\r\n", &mut state, None).expect("not blank");
        assert_eq!(intent.body().message(), "status");
    }

    #[test]
    fn test_blank_lines_are_no_ops() {
        let mut state = BridgeState::new();
        let before = state.clone();

        assert_eq!(compose("", &mut state, None), None);
        assert_eq!(compose("\r\n", &mut state, None), None);
        assert_eq!(compose("   ", &mut state, None), None);
        assert_eq!(state, before);
    }

    #[test]
    fn test_reply_command_is_hub_signal() {
        let body = StructuredMessage::new().with("id", 42u32);

        let cmd = OutboundIntent::Reply(body.clone()).into_command("incoming", 2);

        assert_eq!(commands::verb(&cmd), "hub.signal");
        assert_eq!(commands::body_of(&cmd), Some(body));
    }

    #[test]
    fn test_new_request_command_is_web_post_to_route() {
        let body = StructuredMessage::new().with("id", 1u32);

        let cmd = OutboundIntent::NewRequest(body).into_command("ops", 5);

        assert_eq!(commands::verb(&cmd), "web.post");
        assert_eq!(cmd.get_str("route"), "ops");
        assert_eq!(cmd.get_i64("seconds"), 5);
    }
}
