//! # sioscope-proto
//!
//! Shared primitives for the sioscope inspection console.
//!
//! This crate provides the foundational abstractions used across all sioscope
//! crates:
//! - The synchronous `EventBus` for in-process pub/sub
//! - `Subscription` handles for removing a single handler
//! - The `Topic` name type

mod event_bus;
mod topic;

pub use event_bus::{DispatchReport, EventBus, HandlerError, HandlerResult, Subscription};
pub use topic::Topic;
