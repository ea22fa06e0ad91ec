//! Channel contract between the console and a transport task.
//!
//! The console side is single-threaded; the transport runs on its own task
//! and is reached only through these channels.

use serde_json::Value;
use tokio::sync::mpsc;

/// Request from the console to the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    /// Write `payload` as a compact JSON text frame.
    Send(Value),
    /// Close the current connection, if any, and connect again.
    Restart,
    /// Close the connection and stop the task.
    Shutdown,
}

/// Event reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Inbound text frame.
    Frame(String),
    Connected,
    Disconnected,
    /// Connection-level failure.
    Error(String),
    SendCompleted(Value),
    SendFailed { payload: Value, error: String },
    RestartCompleted,
    RestartFailed(String),
}

/// Console-side ends of the transport channels.
#[derive(Debug)]
pub struct TransportHandle {
    pub commands: mpsc::UnboundedSender<TransportCommand>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Transport-side ends of the transport channels.
#[derive(Debug)]
pub struct TransportEndpoint {
    pub commands: mpsc::UnboundedReceiver<TransportCommand>,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

/// Creates a connected handle/endpoint pair.
pub fn transport_channel() -> (TransportHandle, TransportEndpoint) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    (
        TransportHandle {
            commands: command_tx,
            events: event_rx,
        },
        TransportEndpoint {
            commands: command_rx,
            events: event_tx,
        },
    )
}
