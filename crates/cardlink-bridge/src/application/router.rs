//! Notification classifier and router.
//!
//! Every line received on the control module's aux channel goes through
//! [`route`] exactly once.  The line is classified by its `type` key:
//!
//! ```text
//! parse failure          → None (no state change, no work)
//! type == "env"          → EnvironmentSnapshot updated
//! type == "" class "log" → message text for the consoles
//! type == "" otherwise   → id stamped if missing, tracker toggled,
//!                          serialized message for the consoles
//! any other type         → ignored
//! ```
//!
//! The function only decides and updates state; writing the resulting text
//! to the consoles is the caller's job (see [`Routed::console_text`]).

use cardlink_core::{parse, protocol::message::keys, serialize, trim_line_end, Registration};
use tracing::debug;

use crate::application::bridge_service::BridgeState;

/// Notification types the router understands.
const TYPE_COMMAND: &str = "";
const TYPE_ENV: &str = "env";
/// The only command-style class with special handling.
const CLASS_LOG: &str = "log";

/// What a successfully parsed notification turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// An `env` notification; `applied` is `false` when it was stale.
    Environment { modified: i64, applied: bool },
    /// A `log` notification carrying `message` (possibly empty).
    Log { message: String },
    /// A relayed message.  `line` is what the consoles receive: the original
    /// line when it already carried an id, the re-serialized message when the
    /// id was generated here.
    Relay {
        id: u32,
        registration: Registration,
        line: String,
    },
    /// A notification of a type this bridge does not handle.
    Unrecognized { notification_type: String },
}

impl Routed {
    /// Text to write to every console, including the trailing newline, or
    /// `None` when the consoles receive nothing.
    pub fn console_text(&self) -> Option<String> {
        match self {
            Routed::Log { message } if !message.is_empty() => Some(format!("{message}\n")),
            Routed::Relay { line, .. } => Some(format!("{line}\n")),
            _ => None,
        }
    }
}

/// Classifies one aux-channel line and applies its state transition.
///
/// Returns `None` when the line does not parse; in that case nothing in
/// `state` has changed.  `trusted_now` is only consulted when a relayed
/// message needs a fresh id.
pub fn route(line: &[u8], state: &mut BridgeState, trusted_now: Option<u32>) -> Option<Routed> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => trim_line_end(text),
        Err(e) => {
            debug!("notification is not UTF-8, ignoring: {e}");
            return None;
        }
    };
    let mut note = match parse(text) {
        Ok(note) => note,
        Err(e) => {
            debug!("notification does not parse, ignoring: {e}");
            return None;
        }
    };

    let notification_type = note.notification_type().to_string();
    let routed = match notification_type.as_str() {
        TYPE_COMMAND if note.class() == CLASS_LOG => Routed::Log {
            message: note.message().to_string(),
        },

        TYPE_COMMAND => {
            let (id, line) = match note.id() {
                0 => {
                    let id = state.ids.next(trusted_now);
                    note.set_id(id);
                    (id, serialize(&note))
                }
                id => (id, text.to_string()),
            };
            let registration = state.pending.register(id);
            debug!("relaying notification id {id} ({registration:?})");
            Routed::Relay {
                id,
                registration,
                line,
            }
        }

        TYPE_ENV => {
            let modified = note.modified();
            let applied = state
                .environment
                .apply(modified, note.get_object(keys::BODY));
            Routed::Environment { modified, applied }
        }

        other => {
            debug!("notify: ignoring '{other}'");
            Routed::Unrecognized {
                notification_type: other.to_string(),
            }
        }
    };
    Some(routed)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn route_str(line: &str, state: &mut BridgeState) -> Option<Routed> {
        route(line.as_bytes(), state, None)
    }

    // ── Environment ───────────────────────────────────────────────────────────

    #[test]
    fn test_env_notification_updates_snapshot() {
        // Arrange
        let mut state = BridgeState::new();

        // Act
        let routed = route_str(
            r#"{"type":"env","modified":1000,"body":{"k":"v"}}"#,
            &mut state,
        );

        // Assert
        assert_eq!(
            routed,
            Some(Routed::Environment {
                modified: 1000,
                applied: true
            })
        );
        assert_eq!(state.environment.modified(), 1000);
        assert_eq!(state.environment.get("k"), Some("v"));
    }

    #[test]
    fn test_env_notification_without_body_keeps_vars() {
        let mut state = BridgeState::new();
        route_str(r#"{"type":"env","modified":1,"body":{"k":"v"}}"#, &mut state);

        route_str(r#"{"type":"env","modified":2}"#, &mut state);

        assert_eq!(state.environment.modified(), 2);
        assert_eq!(state.environment.get("k"), Some("v"));
    }

    #[test]
    fn test_env_notification_produces_no_console_text() {
        let mut state = BridgeState::new();
        let routed = route_str(r#"{"type":"env","modified":1}"#, &mut state).expect("parses");
        assert_eq!(routed.console_text(), None);
    }

    // ── Log ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_log_notification_yields_message_line() {
        let mut state = BridgeState::new();

        let routed =
            route_str(r#"{"type":"","class":"log","message":"hello"}"#, &mut state).expect("parses");

        assert_eq!(routed.console_text().as_deref(), Some("hello\n"));
        assert!(state.pending.is_empty(), "log lines are not tracked");
    }

    #[test]
    fn test_log_notification_without_type_key_is_command_style() {
        let mut state = BridgeState::new();
        let routed = route_str(r#"{"class":"log","message":"hi"}"#, &mut state).expect("parses");
        assert_eq!(routed.console_text().as_deref(), Some("hi\n"));
    }

    #[test]
    fn test_empty_log_message_writes_nothing() {
        let mut state = BridgeState::new();
        let routed = route_str(r#"{"class":"log","message":""}"#, &mut state).expect("parses");
        assert_eq!(routed.console_text(), None);
    }

    // ── Relay ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_relay_with_id_forwards_original_line_and_tracks_id() {
        // Arrange
        let mut state = BridgeState::new();
        let line = r#"{"id":77,"class":"req","message":"ping?"}"#;

        // Act
        let routed = route_str(line, &mut state).expect("parses");

        // Assert
        assert_eq!(routed.console_text(), Some(format!("{line}\n")));
        assert!(state.pending.contains(77));
        assert!(matches!(
            routed,
            Routed::Relay {
                id: 77,
                registration: Registration::Tracked,
                ..
            }
        ));
    }

    #[test]
    fn test_relay_without_id_is_stamped_and_reserialized() {
        // Arrange
        let mut state = BridgeState::new();

        // Act
        let routed =
            route(br#"{"class":"req","message":"x"}"#, &mut state, Some(5_000)).expect("parses");

        // Assert
        let Routed::Relay { id, line, .. } = routed else {
            panic!("expected a relay, got {routed:?}");
        };
        assert_eq!(id, 5_000);
        assert_eq!(line, r#"{"class":"req","message":"x","id":5000}"#);
        assert!(state.pending.contains(5_000));
    }

    #[test]
    fn test_relay_of_pending_id_toggles_it_off() {
        let mut state = BridgeState::new();
        state.pending.register(9);

        let routed = route_str(r#"{"id":9,"class":"rsp"}"#, &mut state).expect("parses");

        assert!(matches!(
            routed,
            Routed::Relay {
                registration: Registration::Cancelled,
                ..
            }
        ));
        assert!(!state.pending.contains(9));
    }

    #[test]
    fn test_relay_trims_trailing_carriage_return() {
        let mut state = BridgeState::new();
        let routed = route_str("{\"id\":3,\"class\":\"x\"}\r", &mut state).expect("parses");
        assert_eq!(
            routed.console_text().as_deref(),
            Some("{\"id\":3,\"class\":\"x\"}\n")
        );
    }

    // ── Ignored input ─────────────────────────────────────────────────────────

    #[test]
    fn test_unknown_type_changes_nothing() {
        let mut state = BridgeState::new();
        let before = state.clone();

        let routed = route_str(r#"{"type":"weird","id":4}"#, &mut state).expect("parses");

        assert_eq!(
            routed,
            Routed::Unrecognized {
                notification_type: "weird".to_string()
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_unparseable_line_changes_nothing() {
        // Arrange
        let mut state = BridgeState::new();
        let before = state.clone();

        // Act
        let routed = route_str("{\"type\":\"env\",", &mut state);

        // Assert
        assert_eq!(routed, None);
        assert_eq!(state, before);
    }

    #[test]
    fn test_invalid_utf8_changes_nothing() {
        let mut state = BridgeState::new();
        assert_eq!(route(&[b'{', 0xFF, b'}'], &mut state, None), None);
        assert_eq!(state.ids.last_issued(), 0);
    }
}
