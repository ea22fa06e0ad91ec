//! Event bus for pub/sub messaging.
//!
//! The event bus dispatches payloads synchronously to every handler subscribed
//! to a topic, in subscription order. A handler that fails (returns `Err` or
//! panics) is logged and skipped; the remaining handlers still run.
//!
//! The bus is single-threaded. Handlers may subscribe, unsubscribe or publish
//! from inside a dispatch: each publish iterates over the handler list as it
//! stood when the publish began.

use crate::Topic;
use std::cell::RefCell;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};
use tracing::{trace, warn};

/// Error type returned by a failing handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by every handler.
pub type HandlerResult = Result<(), HandlerError>;

type Handler<P> = Rc<dyn Fn(&P) -> HandlerResult>;

/// Outcome of a single publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

impl DispatchReport {
    /// Total number of handlers invoked.
    pub fn invoked(&self) -> usize {
        self.delivered + self.failed
    }
}

struct Registry<P> {
    next_id: u64,
    handlers: HashMap<Topic, Vec<(u64, Handler<P>)>>,
}

impl<P> Registry<P> {
    fn remove(&mut self, topic: &str, id: u64) -> bool {
        let Some(list) = self.handlers.get_mut(topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(topic);
        }
        removed
    }
}

/// Central pub/sub hub.
///
/// Generic over the payload type so the bus carries no knowledge of the
/// session model that flows through it.
pub struct EventBus<P> {
    registry: Rc<RefCell<Registry<P>>>,
}

impl<P: 'static> EventBus<P> {
    /// Creates a new empty event bus.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(Registry {
                next_id: 0,
                handlers: HashMap::new(),
            })),
        }
    }

    /// Registers `handler` for `topic`.
    ///
    /// Handlers for the same topic run in the order they were subscribed.
    pub fn subscribe<F>(&self, topic: impl Into<Topic>, handler: F) -> Subscription
    where
        F: Fn(&P) -> HandlerResult + 'static,
    {
        let topic = topic.into();
        let id = {
            let mut registry = self.registry.borrow_mut();
            registry.next_id += 1;
            let id = registry.next_id;
            registry
                .handlers
                .entry(topic.clone())
                .or_default()
                .push((id, Rc::new(handler)));
            id
        };
        trace!(topic = %topic, id, "Handler subscribed");

        let weak: Weak<RefCell<Registry<P>>> = Rc::downgrade(&self.registry);
        let remove_topic = topic.clone();
        Subscription {
            topic,
            id,
            remove: Some(Box::new(move || {
                weak.upgrade()
                    .is_some_and(|registry| registry.borrow_mut().remove(remove_topic.as_str(), id))
            })),
        }
    }

    /// Publishes `payload` to every handler currently subscribed to `topic`.
    ///
    /// Publishing to a topic with no handlers is a silent no-op.
    pub fn publish(&self, topic: &str, payload: &P) -> DispatchReport {
        let handlers: Vec<(u64, Handler<P>)> = match self.registry.borrow().handlers.get(topic) {
            Some(list) => list.clone(),
            None => return DispatchReport::default(),
        };

        let mut report = DispatchReport::default();
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(error)) => {
                    warn!(topic, id, error = %error, "Event handler failed");
                    report.failed += 1;
                }
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    warn!(topic, id, reason = %reason, "Event handler panicked");
                    report.failed += 1;
                }
            }
        }

        trace!(topic, delivered = report.delivered, failed = report.failed, "Published");
        report
    }

    /// Returns the number of handlers subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Removes every handler from every topic.
    ///
    /// Called once at shutdown. Outstanding `Subscription` handles become
    /// no-ops.
    pub fn clear(&self) {
        self.registry.borrow_mut().handlers.clear();
    }
}

impl<P: 'static> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping the handle leaves the handler registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    topic: Topic,
    id: u64,
    remove: Option<Box<dyn FnOnce() -> bool>>,
}

impl Subscription {
    /// Removes exactly this handler from the bus.
    ///
    /// Idempotent: calling it again has no further effect. Returns `true` only
    /// on the call that actually removed the handler.
    pub fn unsubscribe(&mut self) -> bool {
        self.remove.take().is_some_and(|remove| remove())
    }

    /// Topic this subscription listens on.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Returns true until `unsubscribe` has been called.
    pub fn is_active(&self) -> bool {
        self.remove.is_some()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_handler_fires_twice_then_stops_after_unsubscribe() {
        let bus: EventBus<u32> = EventBus::new();
        let count = Rc::new(Cell::new(0));

        let counter = Rc::clone(&count);
        let mut sub = bus.subscribe("tick", move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        bus.publish("tick", &1);
        bus.publish("tick", &2);
        assert!(sub.unsubscribe());
        bus.publish("tick", &3);

        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus: EventBus<()> = EventBus::new();
        let mut first = bus.subscribe("t", |()| Ok(()));
        let _second = bus.subscribe("t", |()| Ok(()));

        assert!(first.unsubscribe());
        assert!(!first.unsubscribe());
        assert!(!first.is_active());
        assert_eq!(bus.subscriber_count("t"), 1);
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let bus: EventBus<&'static str> = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for name in ["a", "b", "c"] {
            let seen = Rc::clone(&seen);
            bus.subscribe("order", move |payload: &&'static str| {
                seen.borrow_mut().push(format!("{name}:{payload}"));
                Ok(())
            });
        }

        let report = bus.publish("order", &"x");
        assert_eq!(report.delivered, 3);
        assert_eq!(*seen.borrow(), vec!["a:x", "b:x", "c:x"]);
    }

    #[test]
    fn test_publish_without_handlers_is_noop() {
        let bus: EventBus<String> = EventBus::new();
        let report = bus.publish("nobody:listens", &"hi".to_string());
        assert_eq!(report, DispatchReport::default());
    }

    #[test]
    fn test_failing_handler_does_not_stop_dispatch() {
        let bus: EventBus<()> = EventBus::new();
        let reached = Rc::new(Cell::new(false));

        bus.subscribe("t", |()| Err("boom".into()));
        bus.subscribe("t", |()| panic!("handler exploded"));
        let flag = Rc::clone(&reached);
        bus.subscribe("t", move |()| {
            flag.set(true);
            Ok(())
        });

        let report = bus.publish("t", &());
        assert!(reached.get());
        assert_eq!(report.failed, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.invoked(), 3);
    }

    #[test]
    fn test_topics_are_isolated() {
        let bus: EventBus<()> = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        bus.subscribe("a", move |()| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        bus.publish("b", &());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_publish_from_handler_does_not_deadlock() {
        let bus = Rc::new(EventBus::<u8>::new());
        let inner_hits = Rc::new(Cell::new(0));

        let hits = Rc::clone(&inner_hits);
        bus.subscribe("inner", move |_| {
            hits.set(hits.get() + 1);
            Ok(())
        });

        let nested = Rc::clone(&bus);
        bus.subscribe("outer", move |value| {
            nested.publish("inner", value);
            Ok(())
        });

        bus.publish("outer", &7);
        assert_eq!(inner_hits.get(), 1);
    }

    #[test]
    fn test_handler_removed_mid_dispatch_still_runs_for_current_publish() {
        let bus = Rc::new(EventBus::<()>::new());
        let count = Rc::new(Cell::new(0));

        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&victim);
        bus.subscribe("t", move |()| {
            if let Some(sub) = slot.borrow_mut().as_mut() {
                sub.unsubscribe();
            }
            Ok(())
        });
        let counter = Rc::clone(&count);
        *victim.borrow_mut() = Some(bus.subscribe("t", move |()| {
            counter.set(counter.get() + 1);
            Ok(())
        }));

        bus.publish("t", &());
        bus.publish("t", &());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_clear_removes_everything() {
        let bus: EventBus<()> = EventBus::new();
        let mut sub = bus.subscribe("a", |()| Ok(()));
        bus.subscribe("b", |()| Ok(()));

        bus.clear();
        assert_eq!(bus.subscriber_count("a"), 0);
        assert_eq!(bus.subscriber_count("b"), 0);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let bus: EventBus<()> = EventBus::new();
        let mut sub = bus.subscribe("a", |()| Ok(()));
        drop(bus);
        assert!(!sub.unsubscribe());
    }
}
