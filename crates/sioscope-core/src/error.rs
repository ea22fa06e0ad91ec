//! Error types for the message pipeline.

use thiserror::Error;

/// Errors surfaced by the console core.
///
/// None of these are fatal: the console keeps ingesting after any of them.
#[derive(Debug, Error)]
pub enum Error {
    /// Builder name is not registered.
    #[error("unknown builder: {0}")]
    UnknownBuilder(String),

    /// Override names a field the builder template does not declare.
    #[error("builder {builder} has no field {field}")]
    UnknownField { builder: String, field: String },

    /// Text that should have been JSON was not.
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Connection-level failure, including failed restarts.
    #[error("transport error: {0}")]
    Transport(String),

    /// Outbound payload was rejected before or during send.
    #[error("send failed: {0}")]
    SendFailure(String),

    /// Store mutation attempted while `state:changed` was being dispatched.
    #[error("store mutation attempted during state:changed dispatch")]
    ReentrantMutation,

    /// Operator command line could not be understood.
    #[error("{0}")]
    InvalidCommand(String),
}

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, Error>;
