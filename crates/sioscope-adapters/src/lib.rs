//! # sioscope-adapters
//!
//! Adapters connecting the sioscope console core to the outside world.
//!
//! - `ws`: the WebSocket transport task. It owns the socket and talks to the
//!   console only through the `TransportCommand`/`TransportEvent` channels.
//! - `console`: the headless presentation. It prints messages and notices
//!   as they arrive and reads operator commands from stdin.
//!
//! The console context itself is single-threaded, so the driver loop in
//! `console::drive` runs on the current task and never spawns it.

mod console;
mod ws;

pub use console::{
    HeadlessPresenter, MessageSink, QuietSink, WriterSink, drive, spawn_stdin_reader,
};
pub use ws::{WsError, spawn_transport};
