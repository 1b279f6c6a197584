//! The structured message exchanged on every cardlink channel.
//!
//! A [`StructuredMessage`] is an ordered mapping from string keys to JSON
//! values.  It is a thin newtype over [`serde_json::Map`]: the workspace
//! enables serde_json's `preserve_order` feature, so a message relayed from
//! the control module to the consoles keeps the key order it arrived with.
//!
//! # Protocol keys
//!
//! ```json
//! {"type":"","class":"log","message":"hello","id":1700000000}
//! {"type":"env","modified":1000,"body":{"k":"v"}}
//! ```
//!
//! | Key        | Meaning                                                   |
//! |------------|-----------------------------------------------------------|
//! | `id`       | Correlation id, `0` (or absent) = no correlation          |
//! | `type`     | Notification category; empty = command-style message      |
//! | `class`    | Sub-category of a command-style message (e.g. `"log"`)    |
//! | `message`  | Text payload                                              |
//! | `modified` | Control-module timestamp of an environment change         |
//! | `body`     | Nested mapping, opaque payload                            |
//!
//! The typed accessors never fail.  A missing or mistyped key reads as the
//! zero value of its type (`""`, `0`, `false`, `None`), which is how the
//! router and composer treat absent fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Well-known protocol keys.
pub mod keys {
    pub const ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const CLASS: &str = "class";
    pub const MESSAGE: &str = "message";
    pub const MODIFIED: &str = "modified";
    pub const BODY: &str = "body";
}

/// An ordered key/value document parsed from (or destined for) one line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredMessage(Map<String, Value>);

impl StructuredMessage {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps an existing JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Borrows the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the message and returns the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Consumes the message and returns it as a [`Value::Object`].
    ///
    /// Used when a composed message is nested as the `body` of a
    /// control-module command.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Returns the raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts or replaces `key`, returning the previous value.
    ///
    /// Replacing an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style variant of [`insert`](Self::insert).
    ///
    /// ```rust
    /// use cardlink_core::StructuredMessage;
    ///
    /// let msg = StructuredMessage::new()
    ///     .with("class", "log")
    ///     .with("message", "hello");
    /// assert_eq!(msg.class(), "log");
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns `true` when `key` is present, whatever its value.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the message has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // ── Typed accessors ───────────────────────────────────────────────────────

    /// String value of `key`, or `""` when absent or not a string.
    pub fn get_str(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// Boolean value of `key`, or `false` when absent or not a boolean.
    pub fn get_bool(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Integer value of `key`, or `0` when absent or not a number.
    ///
    /// Floating-point numbers are truncated toward zero, matching how the
    /// control module's timestamps are occasionally encoded as `1.7e9`.
    pub fn get_i64(&self, key: &str) -> i64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Nested object stored under `key`, if it is an object.
    pub fn get_object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    // ── Protocol accessors ────────────────────────────────────────────────────

    /// Correlation id.  `0` means "no correlation requested".
    ///
    /// Negative, fractional, or larger-than-`u32` values are not valid ids
    /// and read as `0`.
    pub fn id(&self) -> u32 {
        match self.0.get(keys::ID) {
            Some(Value::Number(n)) => {
                if let Some(v) = n.as_u64() {
                    u32::try_from(v).unwrap_or(0)
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64 => {
                            f as u32
                        }
                        _ => 0,
                    }
                }
            }
            _ => 0,
        }
    }

    /// Stamps `id` into the message, replacing any existing value.
    pub fn set_id(&mut self, id: u32) {
        self.insert(keys::ID, id);
    }

    /// Notification category (`type` key).  Empty for command-style messages.
    pub fn notification_type(&self) -> &str {
        self.get_str(keys::TYPE)
    }

    /// Sub-category of a command-style message (`class` key).
    pub fn class(&self) -> &str {
        self.get_str(keys::CLASS)
    }

    /// Text payload (`message` key).
    pub fn message(&self) -> &str {
        self.get_str(keys::MESSAGE)
    }

    /// Modification timestamp of an environment notification.
    pub fn modified(&self) -> i64 {
        self.get_i64(keys::MODIFIED)
    }

    /// Opaque nested payload (`body` key).
    pub fn body(&self) -> Option<&Map<String, Value>> {
        self.get_object(keys::BODY)
    }
}

impl From<Map<String, Value>> for StructuredMessage {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<StructuredMessage> for Value {
    fn from(msg: StructuredMessage) -> Self {
        msg.into_value()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
