//! # sioscope-tui
//!
//! Terminal user interface for the sioscope inspection console.
//!
//! Built with `ratatui` and `crossterm`, this crate provides:
//! - A live message list rendered from `state:changed` snapshots
//! - Keyboard navigation, tag filtering and message expansion
//! - A command line sharing the headless console's command set

mod app;
pub mod input;
pub mod state;
pub mod widgets;

use anyhow::Result;
use app::App;
use sioscope_core::{Console, Payload, TransportEvent, topics};
use sioscope_proto::Subscription;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use tokio::sync::mpsc;

pub use app::draw;
pub use state::TuiState;
pub use widgets::{footer, header, help, messages};

/// Main TUI handle that observes a console's bus.
pub struct Tui {
    state: Rc<RefCell<TuiState>>,
    subscriptions: Vec<Subscription>,
}

impl Tui {
    /// Subscribes to `state:changed` and `ui:notice` on `console`'s bus.
    pub fn attach(console: &Console) -> Self {
        let state = Rc::new(RefCell::new(TuiState::new()));
        state.borrow_mut().apply_snapshot(console.state());

        let mut subscriptions = Vec::new();

        let observer = Rc::clone(&state);
        subscriptions.push(console.bus().subscribe(
            topics::STATE_CHANGED,
            move |payload: &Payload| {
                if let Payload::State(snapshot) = payload {
                    observer.try_borrow_mut()?.apply_snapshot(snapshot.clone());
                }
                Ok(())
            },
        ));

        let observer = Rc::clone(&state);
        subscriptions.push(console.bus().subscribe(topics::NOTICE, move |payload: &Payload| {
            if let Payload::Notice(notice) = payload {
                observer.try_borrow_mut()?.set_notice(notice.clone());
            }
            Ok(())
        }));

        Self {
            state,
            subscriptions,
        }
    }

    /// Shared view state.
    pub fn state(&self) -> Rc<RefCell<TuiState>> {
        Rc::clone(&self.state)
    }

    /// Runs the TUI application loop, then unsubscribes.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized or drawn.
    pub async fn run<F>(
        mut self,
        console: &Console,
        events: &mut mpsc::UnboundedReceiver<TransportEvent>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let app = App::new(console, Rc::clone(&self.state));
        let result = app.run(events, shutdown).await;
        for subscription in &mut self.subscriptions {
            subscription.unsubscribe();
        }
        result
    }
}
