//! Ingestion: tag, format, hand to the store.

use crate::formatter::FormatterRegistry;
use crate::message::{LifecycleEnvelope, MessageOrigin, PendingMessage, is_truthy, tag_of};
use serde_json::{Value, json};
use tracing::warn;

/// Anything that can enter the message log.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInbound {
    /// Unparsed text frame from the transport.
    Frame(String),
    /// Already-parsed remote payload.
    Payload(Value),
    /// Echo of a successfully sent payload (see [`echo_record`]).
    Echo(Value),
    /// Transport lifecycle event.
    Lifecycle(LifecycleEnvelope),
}

/// Tags and formats `raw`, producing a record ready for the store.
///
/// Never fails: a frame that is not JSON becomes an `error` envelope
/// carrying the offending text. Only transport lifecycle events and that
/// fallback are tagged `status`/`error`; remote payloads are tagged by their
/// `event` field alone.
pub fn prepare(raw: RawInbound, formatters: &FormatterRegistry) -> PendingMessage {
    let (payload, tag, origin) = match raw {
        RawInbound::Frame(text) => match serde_json::from_str::<Value>(&text) {
            Ok(payload) => {
                let tag = tag_of(&payload);
                (payload, tag, MessageOrigin::Remote)
            }
            Err(error) => {
                warn!(error = %error, frame = %text, "Received non-JSON frame");
                let envelope = LifecycleEnvelope::error(format!("Received non-JSON message: {text}"));
                let tag = envelope.kind.as_str().to_string();
                (envelope.to_value(), tag, MessageOrigin::Remote)
            }
        },
        RawInbound::Payload(payload) => {
            let tag = tag_of(&payload);
            (payload, tag, MessageOrigin::Remote)
        }
        RawInbound::Echo(payload) => {
            let tag = tag_of(&payload);
            (payload, tag, MessageOrigin::Local)
        }
        RawInbound::Lifecycle(envelope) => {
            let tag = envelope.kind.as_str().to_string();
            (envelope.to_value(), tag, MessageOrigin::Transport)
        }
    };

    let formatted = formatters.format(&tag, &payload);
    PendingMessage {
        raw_payload: payload,
        tag,
        compact_content: formatted.compact,
        full_content: formatted.full,
        origin,
    }
}

/// Record ingested after a successful send.
///
/// `{event: payload.event || "sent", data: payload.data || payload}`.
pub fn echo_record(sent: &Value) -> Value {
    let event = sent
        .get("event")
        .filter(|v| is_truthy(v))
        .cloned()
        .unwrap_or_else(|| json!("sent"));
    let data = sent
        .get("data")
        .filter(|v| is_truthy(v))
        .cloned()
        .unwrap_or_else(|| sent.clone());
    json!({ "event": event, "data": data })
}
