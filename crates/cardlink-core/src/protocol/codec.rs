//! Line codec for structured messages.
//!
//! Wire format: one JSON object per line, UTF-8, terminated by `\n`.
//!
//! ```text
//! {"type":"env","modified":1000,"body":{"k":"v"}}\n
//! ```
//!
//! The codec validates structure only.  There is no schema: unknown keys are
//! carried through untouched so a relayed message reaches the consoles with
//! everything the control module put in it.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::message::StructuredMessage;

/// Errors that can occur while parsing a line.
///
/// Callers treat every variant the same way: the line is dropped and no
/// notification is produced.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The line is not valid UTF-8.
    #[error("invalid UTF-8 in line: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    /// The text is not well-formed JSON (unbalanced braces, bad literal, etc.).
    #[error("malformed structured message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The text is valid JSON but not an object (e.g. `[1,2]` or `"x"`).
    #[error("structured message must be an object, got {0}")]
    NotAnObject(&'static str),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parses one line into a [`StructuredMessage`].
///
/// Leading and trailing whitespace (including the `\r\n` terminator) is
/// ignored.
///
/// # Errors
///
/// Returns [`ParseError::Malformed`] for anything that is not well-formed
/// JSON and [`ParseError::NotAnObject`] for JSON that is not an object.
///
/// # Examples
///
/// ```rust
/// use cardlink_core::protocol::codec::parse;
///
/// let msg = parse(r#"{"type":"","class":"log","message":"hello"}"#).unwrap();
/// assert_eq!(msg.class(), "log");
/// assert!(parse("{\"unbalanced\":").is_err());
/// ```
pub fn parse(line: &str) -> Result<StructuredMessage, ParseError> {
    match serde_json::from_str::<Value>(line.trim())? {
        Value::Object(map) => Ok(StructuredMessage::from_map(map)),
        other => Err(ParseError::NotAnObject(json_kind(&other))),
    }
}

/// Parses one raw line of bytes, validating its encoding first.
///
/// # Errors
///
/// Returns [`ParseError::InvalidEncoding`] when `bytes` is not UTF-8, and
/// otherwise the same errors as [`parse`].
pub fn parse_bytes(bytes: &[u8]) -> Result<StructuredMessage, ParseError> {
    let text = std::str::from_utf8(bytes)?;
    parse(text)
}

/// Serializes a message as a single line of compact JSON (no terminator).
///
/// Serializing an in-memory map of JSON values cannot fail, and compact
/// output never contains a raw newline (newlines inside strings are escaped),
/// so the result is always safe to write as one line.
pub fn serialize(msg: &StructuredMessage) -> String {
    Value::Object(msg.as_map().clone()).to_string()
}

/// Strips trailing ASCII control characters (`\r`, `\n`, `\0`, ...) from a
/// line read from a console.
///
/// Only characters below `0x20` are removed; trailing spaces are part of
/// the operator's text and are kept.
///
/// ```rust
/// use cardlink_core::trim_line_end;
///
/// assert_eq!(trim_line_end("status\r\n"), "status");
/// assert_eq!(trim_line_end("a b "), "a b ");
/// ```
pub fn trim_line_end(line: &str) -> &str {
    line.trim_end_matches(|c: char| c < ' ')
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
