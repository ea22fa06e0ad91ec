//! # sioscope-core
//!
//! Core message pipeline for the sioscope inspection console.
//!
//! This crate provides:
//! - The session `Store` (message log, known tags, active filter)
//! - Tagging and formatting of every inbound and outbound message
//! - The schema-driven message builder registry with field coercion
//! - The service layer bridging UI intents to the transport
//! - The `Console` context that wires all of the above together
//! - Configuration loading and operator command parsing

mod builder;
mod coercion;
mod command;
mod config;
mod console;
mod error;
mod formatter;
mod ingest;
mod message;
mod payload;
mod service;
mod store;
pub mod topics;
mod transport;

pub use builder::{BuilderRegistry, MessageBuilderTemplate, bundled_builders};
pub use coercion::{PASSWORD_FIELD, coerce_field, coerce_fields};
pub use command::{ConsoleCommand, HELP_TEXT, parse_command};
pub use config::{
    BuilderConfig, ConfigError, ConfigWarning, LoggingConfig, SioscopeConfig, TransportConfig,
};
pub use console::{CommandOutcome, ConnectionStatus, Console};
pub use error::{Error, Result};
pub use formatter::{FormattedContent, FormatterRegistry, default_formatter, lifecycle_formatter};
pub use ingest::{RawInbound, echo_record, prepare};
pub use message::{
    LifecycleEnvelope, LifecycleKind, Message, MessageOrigin, PendingMessage, UNKNOWN_TAG, tag_of,
};
pub use payload::{Bus, Notice, NoticeLevel, Payload};
pub use service::ServiceLayer;
pub use store::{SessionState, Store};
pub use transport::{
    TransportCommand, TransportEndpoint, TransportEvent, TransportHandle, transport_channel,
};
