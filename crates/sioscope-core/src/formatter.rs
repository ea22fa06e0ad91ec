//! Display formatters keyed by message tag.
//!
//! Formatting runs once, at ingestion time. The resulting strings are stored
//! on the message, so registering or replacing a formatter later never
//! changes messages already in the log.

use crate::message::LifecycleEnvelope;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Compact and full display strings for a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedContent {
    /// Single-line rendering for list views.
    pub compact: String,
    /// Multi-line rendering for the expanded view.
    pub full: String,
}

type Formatter = Box<dyn Fn(&Value) -> FormattedContent>;

/// Mapping from tag to formatter, with a JSON fallback.
pub struct FormatterRegistry {
    formatters: HashMap<String, Formatter>,
}

impl FormatterRegistry {
    /// Creates a registry with no tag-specific formatters.
    pub fn new() -> Self {
        Self {
            formatters: HashMap::new(),
        }
    }

    /// Creates a registry with the built-in lifecycle formatters for the
    /// `status` and `error` tags.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("status", lifecycle_formatter);
        registry.register("error", lifecycle_formatter);
        registry
    }

    /// Registers (or replaces) the formatter for `tag`.
    pub fn register<F>(&mut self, tag: impl Into<String>, formatter: F)
    where
        F: Fn(&Value) -> FormattedContent + 'static,
    {
        let tag = tag.into();
        debug!(tag = %tag, "Formatter registered");
        self.formatters.insert(tag, Box::new(formatter));
    }

    /// Removes the formatter for `tag`, restoring the default.
    pub fn unregister(&mut self, tag: &str) -> bool {
        self.formatters.remove(tag).is_some()
    }

    /// Returns true if `tag` has a dedicated formatter.
    pub fn has(&self, tag: &str) -> bool {
        self.formatters.contains_key(tag)
    }

    /// Formats `payload` using the formatter for `tag`, or the default.
    pub fn format(&self, tag: &str, payload: &Value) -> FormattedContent {
        match self.formatters.get(tag) {
            Some(formatter) => formatter(payload),
            None => default_formatter(payload),
        }
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// Compact single-line JSON and two-space indented JSON.
pub fn default_formatter(payload: &Value) -> FormattedContent {
    FormattedContent {
        compact: payload.to_string(),
        full: format!("{payload:#}"),
    }
}

/// `[status] content` for lifecycle envelopes; other payloads fall back to
/// the default rendering.
pub fn lifecycle_formatter(payload: &Value) -> FormattedContent {
    match LifecycleEnvelope::from_value(payload) {
        Some(envelope) => FormattedContent {
            compact: format!("[{}] {}", envelope.kind.as_str(), envelope.content),
            full: format!("{payload:#}"),
        },
        None => default_formatter(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_formatter_compact_and_pretty() {
        let payload = json!({"event": "Ping", "data": {"n": 1}});
        let formatted = default_formatter(&payload);

        assert_eq!(formatted.compact, r#"{"event":"Ping","data":{"n":1}}"#);
        assert_eq!(
            formatted.full,
            "{\n  \"event\": \"Ping\",\n  \"data\": {\n    \"n\": 1\n  }\n}"
        );
    }

    #[test]
    fn test_unregistered_tag_uses_default() {
        let registry = FormatterRegistry::new();
        let payload = json!({"event": "Nope"});
        assert_eq!(registry.format("Nope", &payload), default_formatter(&payload));
    }

    #[test]
    fn test_registered_formatter_is_used() {
        let mut registry = FormatterRegistry::new();
        registry.register("ChatRoomMessage", |payload: &Value| FormattedContent {
            compact: format!("chat: {}", payload["data"]["Content"].as_str().unwrap_or("")),
            full: payload.to_string(),
        });

        let formatted = registry.format(
            "ChatRoomMessage",
            &json!({"event": "ChatRoomMessage", "data": {"Content": "hi"}}),
        );
        assert_eq!(formatted.compact, "chat: hi");
        assert!(registry.has("ChatRoomMessage"));

        assert!(registry.unregister("ChatRoomMessage"));
        assert!(!registry.has("ChatRoomMessage"));
    }

    #[test]
    fn test_lifecycle_formatter() {
        let registry = FormatterRegistry::with_builtin();
        let payload = LifecycleEnvelope::status("WebSocket connected!").to_value();
        let formatted = registry.format("status", &payload);

        assert_eq!(formatted.compact, "[status] WebSocket connected!");
        assert!(formatted.full.contains("WebSocket connected!"));
    }

    #[test]
    fn test_lifecycle_formatter_falls_back_for_other_shapes() {
        let payload = json!({"event": "error", "data": {"code": 3}});
        assert_eq!(lifecycle_formatter(&payload), default_formatter(&payload));
    }
}
