//! Message records stored in the session log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

/// Tag assigned to payloads without a usable `event` field.
pub const UNKNOWN_TAG: &str = "unknown";

/// Where a stored message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageOrigin {
    /// Frame received from the remote peer.
    Remote,
    /// Echo of a message this console sent successfully.
    Local,
    /// Synthesized by the transport (connect, disconnect, errors).
    Transport,
}

/// Kind of a transport lifecycle envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Status,
    Error,
}

impl LifecycleKind {
    /// Wire name, also used as the message tag.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleKind::Status => "status",
            LifecycleKind::Error => "error",
        }
    }
}

/// `{type: "status"|"error", content}` record synthesized for transport
/// lifecycle events and unparseable frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEnvelope {
    pub kind: LifecycleKind,
    pub content: String,
}

impl LifecycleEnvelope {
    /// Creates a status envelope.
    pub fn status(content: impl Into<String>) -> Self {
        Self {
            kind: LifecycleKind::Status,
            content: content.into(),
        }
    }

    /// Creates an error envelope.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: LifecycleKind::Error,
            content: content.into(),
        }
    }

    /// Recognizes a lifecycle envelope shape in an arbitrary payload.
    ///
    /// Payloads carrying a truthy `event` field are never envelopes.
    pub fn from_value(payload: &Value) -> Option<Self> {
        let obj = payload.as_object()?;
        if obj.get("event").is_some_and(is_truthy) {
            return None;
        }
        let kind = match obj.get("type")?.as_str()? {
            "status" => LifecycleKind::Status,
            "error" => LifecycleKind::Error,
            _ => return None,
        };
        let content = obj.get("content")?.as_str()?.to_string();
        Some(Self { kind, content })
    }

    /// Wire representation stored as the message's raw payload.
    pub fn to_value(&self) -> Value {
        json!({ "type": self.kind.as_str(), "content": self.content })
    }
}

/// A tagged, formatted record that has not been assigned a position yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub raw_payload: Value,
    pub tag: String,
    pub compact_content: String,
    pub full_content: String,
    pub origin: MessageOrigin,
}

impl PendingMessage {
    pub(crate) fn into_message(self, received_order: u64) -> Message {
        Message {
            raw_payload: self.raw_payload,
            tag: self.tag,
            compact_content: self.compact_content,
            full_content: self.full_content,
            received_order,
            origin: self.origin,
            received_at: Utc::now(),
        }
    }
}

/// A stored message. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub raw_payload: Value,
    pub tag: String,
    pub compact_content: String,
    pub full_content: String,
    /// 1-based position in the session log.
    pub received_order: u64,
    pub origin: MessageOrigin,
    /// Wall-clock arrival time. Display only; ordering uses `received_order`.
    pub received_at: DateTime<Utc>,
}

/// Derives the tag for a payload.
///
/// The tag is the payload's `event` field when it is truthy, and
/// [`UNKNOWN_TAG`] otherwise. Non-string event values are rendered as compact
/// JSON. Lifecycle tags are assigned at ingestion, never read from a payload.
pub fn tag_of(payload: &Value) -> String {
    match payload.get("event").filter(|v| is_truthy(v)) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => UNKNOWN_TAG.to_string(),
    }
}

/// JavaScript truthiness of a JSON value.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
