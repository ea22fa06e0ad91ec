//! Topic names shared by the store, the service layer and the presentations.

/// Published by the store after every mutation. Payload: `Payload::State`.
pub const STATE_CHANGED: &str = "state:changed";

/// Request to send a wire payload. Payload: `Payload::Outbound`.
pub const SEND_MESSAGE: &str = "ui:sendMessage";

/// Request to restart the protocol session. No payload.
pub const RESTART_SIO: &str = "ui:restartSio";

/// Request to restart the connection. No payload.
pub const RESTART_CONNECTION: &str = "ui:restartConnection";

/// Request to clear the message log. No payload.
pub const CLEAR_MESSAGES: &str = "ui:clearMessages";

/// Request to replace the active filter. Payload: `Payload::Filter`.
pub const UPDATE_FILTER: &str = "ui:updateFilter";

/// Operator-visible notice. Payload: `Payload::Notice`.
pub const NOTICE: &str = "ui:notice";
