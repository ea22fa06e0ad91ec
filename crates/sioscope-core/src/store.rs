//! Centralized observable session store.
//!
//! The store is the single mutation surface for [`SessionState`]. Every
//! mutation concludes by publishing `state:changed` with a fresh snapshot, so
//! views are a pure function of the latest snapshot and never diff.

use crate::error::{Error, Result};
use crate::message::{Message, PendingMessage};
use crate::payload::{Bus, Payload};
use crate::topics;
use indexmap::IndexSet;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};

/// Session log, known tags and the active filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Messages in arrival order.
    pub messages: Vec<Rc<Message>>,
    /// Every tag seen since the last clear, in first-seen order.
    pub known_tags: IndexSet<String>,
    /// Tags to show. Empty means show everything.
    pub active_filter: IndexSet<String>,
}

impl SessionState {
    /// Messages passing the active filter, in order.
    ///
    /// Filter entries naming tags that are no longer known simply match
    /// nothing.
    pub fn visible_messages(&self) -> impl Iterator<Item = &Rc<Message>> {
        self.messages
            .iter()
            .filter(|m| self.active_filter.is_empty() || self.active_filter.contains(&m.tag))
    }

    /// Number of messages passing the active filter.
    pub fn visible_count(&self) -> usize {
        self.visible_messages().count()
    }
}

/// Process-wide holder of [`SessionState`].
pub struct Store {
    state: RefCell<SessionState>,
    bus: Rc<Bus>,
    dispatching: Cell<bool>,
}

impl Store {
    /// Creates an empty store publishing on `bus`.
    pub fn new(bus: Rc<Bus>) -> Self {
        Self {
            state: RefCell::new(SessionState::default()),
            bus,
            dispatching: Cell::new(false),
        }
    }

    /// Returns a snapshot of the current state.
    ///
    /// The snapshot owns its collections; messages are shared because they
    /// are immutable.
    pub fn get_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.state.borrow().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a message, assigning the next `received_order`.
    pub fn add_message(&self, pending: PendingMessage) -> Result<Rc<Message>> {
        self.guard()?;
        let message = {
            let mut state = self.state.borrow_mut();
            let order = state.messages.len() as u64 + 1;
            let message = Rc::new(pending.into_message(order));
            if !state.known_tags.contains(&message.tag) {
                state.known_tags.insert(message.tag.clone());
            }
            state.messages.push(Rc::clone(&message));
            message
        };
        debug!(tag = %message.tag, order = message.received_order, "Message stored");
        self.publish_changed();
        Ok(message)
    }

    /// Empties messages, known tags and the active filter.
    pub fn clear_messages(&self) -> Result<()> {
        self.guard()?;
        {
            let mut state = self.state.borrow_mut();
            state.messages.clear();
            state.known_tags.clear();
            state.active_filter.clear();
        }
        debug!("Messages cleared");
        self.publish_changed();
        Ok(())
    }

    /// Replaces the active filter wholesale.
    pub fn update_selected_events(&self, filter: IndexSet<String>) -> Result<()> {
        self.guard()?;
        debug!(filter = ?filter, "Filter updated");
        self.state.borrow_mut().active_filter = filter;
        self.publish_changed();
        Ok(())
    }

    fn guard(&self) -> Result<()> {
        if self.dispatching.get() {
            warn!("Rejected store mutation from inside state:changed");
            return Err(Error::ReentrantMutation);
        }
        Ok(())
    }

    fn publish_changed(&self) {
        let snapshot = Payload::State(self.get_state());
        self.dispatching.set(true);
        self.bus.publish(topics::STATE_CHANGED, &snapshot);
        self.dispatching.set(false);
    }
}
