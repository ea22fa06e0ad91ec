//! Payload carried on the console's event bus.

use crate::store::SessionState;
use indexmap::IndexSet;
use serde_json::Value;
use sioscope_proto::EventBus;
use std::fmt;

/// Event bus specialized to console payloads.
pub type Bus = EventBus<Payload>;

/// Everything that can travel over a console topic.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Topics that carry no data (`ui:clearMessages`, restart requests).
    Empty,
    /// Full session snapshot, published on `state:changed`.
    State(SessionState),
    /// Wire payload to send, published on `ui:sendMessage`.
    Outbound(Value),
    /// Replacement filter, published on `ui:updateFilter`.
    Filter(IndexSet<String>),
    /// Operator notice, published on `ui:notice`.
    Notice(Notice),
}

/// Severity of an operator notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Warn => "warn",
            NoticeLevel::Error => "error",
        }
    }
}

/// A short message for the operator. Notices are never stored in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warn,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.as_str(), self.text)
    }
}
