//! Mirror of the control module's environment variables.
//!
//! The control module owns a set of string variables that can be edited from
//! the cloud.  The bridge learns about them in two ways:
//!
//! - a **full refresh** (`env.get` response: `time` + `body`), issued at
//!   startup, and
//! - a **push notification** (`{"type":"env","modified":T,"body":{...}}`)
//!   whenever the set changes.
//!
//! Both carry the complete variable set, so the snapshot is replaced
//! wholesale rather than merged.  The modification time comes from the
//! control module's clock and never moves backwards: an update older than
//! the snapshot is ignored.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

/// Last known environment variables and their modification time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    modified: i64,
    vars: BTreeMap<String, String>,
}

impl EnvironmentSnapshot {
    /// Creates an empty snapshot with modification time `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an update stamped `modified`.
    ///
    /// When `body` is present the variables are replaced by its contents;
    /// without a body only the timestamp moves.  Returns `false` (and
    /// changes nothing) when `modified` is older than the current snapshot.
    ///
    /// String values are stored as-is; any other JSON value is stored as its
    /// compact JSON text.
    pub fn apply(&mut self, modified: i64, body: Option<&Map<String, Value>>) -> bool {
        if modified < self.modified {
            debug!(
                "ignoring stale environment update (modified {modified} < {})",
                self.modified
            );
            return false;
        }
        self.modified = modified;
        if let Some(body) = body {
            self.vars = body
                .iter()
                .map(|(name, value)| {
                    let text = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (name.clone(), text)
                })
                .collect();
        }
        true
    }

    /// Modification time of the current snapshot.
    pub fn modified(&self) -> i64 {
        self.modified
    }

    /// Value of variable `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// All variables, sorted by name.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// `true` when no variables are set.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_apply_sets_time_and_vars() {
        // Arrange
        let mut env = EnvironmentSnapshot::new();
        let update = body(json!({"k": "v"}));

        // Act
        let applied = env.apply(1000, Some(&update));

        // Assert
        assert!(applied);
        assert_eq!(env.modified(), 1000);
        assert_eq!(env.get("k"), Some("v"));
    }

    #[test]
    fn test_apply_replaces_wholesale() {
        let mut env = EnvironmentSnapshot::new();
        env.apply(1, Some(&body(json!({"a": "1", "b": "2"}))));

        env.apply(2, Some(&body(json!({"b": "3"}))));

        assert_eq!(env.get("a"), None, "variables absent from the update are removed");
        assert_eq!(env.get("b"), Some("3"));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn test_apply_without_body_only_moves_time() {
        let mut env = EnvironmentSnapshot::new();
        env.apply(1, Some(&body(json!({"a": "1"}))));

        assert!(env.apply(5, None));

        assert_eq!(env.modified(), 5);
        assert_eq!(env.get("a"), Some("1"));
    }

    #[test]
    fn test_stale_update_is_ignored() {
        let mut env = EnvironmentSnapshot::new();
        env.apply(10, Some(&body(json!({"a": "new"}))));

        let applied = env.apply(9, Some(&body(json!({"a": "old"}))));

        assert!(!applied);
        assert_eq!(env.modified(), 10);
        assert_eq!(env.get("a"), Some("new"));
    }

    #[test]
    fn test_equal_timestamp_is_applied() {
        let mut env = EnvironmentSnapshot::new();
        env.apply(10, Some(&body(json!({"a": "1"}))));
        assert!(env.apply(10, Some(&body(json!({"a": "2"})))));
        assert_eq!(env.get("a"), Some("2"));
    }

    #[test]
    fn test_non_string_values_are_stored_as_json_text() {
        let mut env = EnvironmentSnapshot::new();
        env.apply(1, Some(&body(json!({"n": 5, "b": true, "o": {"x": 1}}))));

        assert_eq!(env.get("n"), Some("5"));
        assert_eq!(env.get("b"), Some("true"));
        assert_eq!(env.get("o"), Some(r#"{"x":1}"#));
    }
}
