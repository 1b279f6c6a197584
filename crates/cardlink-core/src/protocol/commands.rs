//! Builders for the requests and commands sent to the control module.
//!
//! The control module accepts two shapes of outbound line:
//!
//! - a **request** (`{"req":"card.version"}`) which is answered with exactly
//!   one response line, and
//! - a **command** (`{"cmd":"web.post",...}`) which is fire-and-forget.
//!
//! Operator traffic only ever uses the two command verbs built by
//! [`web_post`] and [`hub_signal`].  The remaining builders cover the
//! one-time bring-up sequence and the environment / clock queries.

use serde_json::Value;

use crate::protocol::message::StructuredMessage;

/// Key naming the verb of a request that expects a response.
pub const REQUEST_KEY: &str = "req";
/// Key naming the verb of a command that expects no response.
pub const COMMAND_KEY: &str = "cmd";
/// Key carrying the error string in a failed response.
pub const ERROR_KEY: &str = "err";

/// Content type attached to every relay-bound post.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Subscription mode for the aux notification channel: notifications only,
/// all other traffic off, signals and environment changes on.
pub const AUX_NOTIFY_MODE: &str = "notify,-all,signals,env";

/// Creates a request (`req`) for `verb`.
pub fn request(verb: &str) -> StructuredMessage {
    StructuredMessage::new().with(REQUEST_KEY, verb)
}

/// Creates a command (`cmd`) for `verb`.
pub fn command(verb: &str) -> StructuredMessage {
    StructuredMessage::new().with(COMMAND_KEY, verb)
}

/// Returns the verb of an outbound line, whichever key carries it.
pub fn verb(msg: &StructuredMessage) -> &str {
    match msg.get_str(REQUEST_KEY) {
        "" => msg.get_str(COMMAND_KEY),
        v => v,
    }
}

/// `true` when the message is a request that expects a response.
pub fn expects_response(msg: &StructuredMessage) -> bool {
    !msg.get_str(REQUEST_KEY).is_empty()
}

/// Error string of a response, if the control module reported one.
pub fn response_error(rsp: &StructuredMessage) -> Option<&str> {
    match rsp.get_str(ERROR_KEY) {
        "" => None,
        e => Some(e),
    }
}

// ── Operator traffic ──────────────────────────────────────────────────────────

/// Durable relay-bound post addressed to `route`.
///
/// ```json
/// {"cmd":"web.post","content":"application/json","route":"incoming",
///  "live":true,"seconds":2,"body":{...}}
/// ```
pub fn web_post(body: StructuredMessage, route: &str, live_seconds: u32) -> StructuredMessage {
    command("web.post")
        .with("content", JSON_CONTENT_TYPE)
        .with("route", route)
        .with("live", true)
        .with("seconds", live_seconds)
        .with("body", body.into_value())
}

/// Short-lived signal answering a waiting party.
///
/// ```json
/// {"cmd":"hub.signal","live":true,"seconds":2,"body":{...}}
/// ```
pub fn hub_signal(body: StructuredMessage, live_seconds: u32) -> StructuredMessage {
    command("hub.signal")
        .with("live", true)
        .with("seconds", live_seconds)
        .with("body", body.into_value())
}

// ── Bring-up and queries ──────────────────────────────────────────────────────

/// `hub.set`: continuous connectivity, periodic uploads, inbound sync once a
/// day and USB-powered outbound pacing.  `product_uid` is omitted when empty.
pub fn hub_set(product_uid: &str) -> StructuredMessage {
    let mut req = request("hub.set");
    if !product_uid.is_empty() {
        req.insert("product", product_uid);
    }
    req.with("mode", "continuous")
        .with("uperiodic", true)
        .with("sync", true)
        .with("inbound", 24 * 60)
        .with("voutbound", "usb:5;60")
}

/// `dfu.status`: reports the host firmware version string.
pub fn dfu_status(version: &str) -> StructuredMessage {
    request("dfu.status").with("version", version)
}

/// `card.aux`: leaves the aux port in its default (non-GPIO) mode.
pub fn card_aux_default() -> StructuredMessage {
    request("card.aux").with("mode", "-")
}

/// `card.voltage`: selects the LiPo discharge curve.
pub fn card_voltage_lipo() -> StructuredMessage {
    request("card.voltage").with("mode", "lipo")
}

/// `card.version`: capability query.
pub fn card_version() -> StructuredMessage {
    request("card.version")
}

/// `card.aux.serial`: subscribes the aux channel to notifications.
///
/// `max_bytes` tells the control module how much it may send before pausing
/// and `pacing_ms` how long to pause; this is the only flow control there is.
pub fn aux_serial_subscribe(max_bytes: u32, pacing_ms: u32) -> StructuredMessage {
    request("card.aux.serial")
        .with("mode", AUX_NOTIFY_MODE)
        .with("max", max_bytes)
        .with("ms", pacing_ms)
}

/// `env.get`: fetches every environment variable in one transaction.
pub fn env_get() -> StructuredMessage {
    request("env.get")
}

/// `card.time`: fetches the control module's clock.
pub fn card_time() -> StructuredMessage {
    request("card.time")
}

/// Extracts the nested `body` of a command as a message, if present.
pub fn body_of(msg: &StructuredMessage) -> Option<StructuredMessage> {
    match msg.get("body") {
        Some(Value::Object(map)) => Some(StructuredMessage::from_map(map.clone())),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
