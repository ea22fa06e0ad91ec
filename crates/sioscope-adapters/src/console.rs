//! Headless console presentation.
//!
//! The `MessageSink` trait abstracts over where console output goes, so the
//! same presenter drives stdout in the binary and an in-memory buffer in
//! tests.

use sioscope_core::{
    CommandOutcome, Console, Message, Notice, NoticeLevel, Payload, TransportEvent, topics,
};
use sioscope_proto::Subscription;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::io::{self, Write};
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receives what the headless console shows.
pub trait MessageSink {
    /// Called once for every newly stored message that passes the filter.
    fn on_message(&mut self, message: &Message);

    /// Called for every operator notice.
    fn on_notice(&mut self, notice: &Notice);

    /// Called when the message log is cleared.
    fn on_cleared(&mut self);
}

/// Writes one line per message and notice.
///
/// Messages go to `out`; warning and error notices go to `err`.
pub struct WriterSink<O: Write, E: Write> {
    out: O,
    err: E,
}

impl WriterSink<io::Stdout, io::Stderr> {
    /// Sink writing to the process's stdout and stderr.
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> WriterSink<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Consumes the sink, returning the writers.
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write, E: Write> MessageSink for WriterSink<O, E> {
    fn on_message(&mut self, message: &Message) {
        let _ = writeln!(
            self.out,
            "#{} {} {}",
            message.received_order, message.tag, message.compact_content
        );
    }

    fn on_notice(&mut self, notice: &Notice) {
        let _ = match notice.level {
            NoticeLevel::Info => writeln!(self.out, "{}", notice.text),
            NoticeLevel::Warn | NoticeLevel::Error => writeln!(self.err, "{notice}"),
        };
    }

    fn on_cleared(&mut self) {
        let _ = writeln!(self.out, "-- messages cleared --");
    }
}

/// Discards everything. Useful when only the log file matters.
pub struct QuietSink;

impl MessageSink for QuietSink {
    fn on_message(&mut self, _message: &Message) {}

    fn on_notice(&mut self, _notice: &Notice) {}

    fn on_cleared(&mut self) {}
}

/// Subscribes a [`MessageSink`] to a console's `state:changed` and
/// `ui:notice` topics.
///
/// Each message is shown at most once, when it is first stored. Changing the
/// filter does not replay older messages.
pub struct HeadlessPresenter {
    subscriptions: Vec<Subscription>,
}

impl HeadlessPresenter {
    pub fn attach<S: MessageSink + 'static>(console: &Console, sink: Rc<RefCell<S>>) -> Self {
        let last_order = Rc::new(Cell::new(0_u64));
        let mut subscriptions = Vec::new();

        let state_sink = Rc::clone(&sink);
        subscriptions.push(console.bus().subscribe(
            topics::STATE_CHANGED,
            move |payload: &Payload| {
                let Payload::State(state) = payload else {
                    return Ok(());
                };
                let newest = state.messages.last().map_or(0, |m| m.received_order);
                if newest < last_order.get() || (state.messages.is_empty() && last_order.get() > 0) {
                    state_sink.borrow_mut().on_cleared();
                    last_order.set(0);
                }
                let mut sink = state_sink.borrow_mut();
                for message in state.visible_messages() {
                    if message.received_order > last_order.get() {
                        sink.on_message(message);
                    }
                }
                last_order.set(newest.max(last_order.get()));
                Ok(())
            },
        ));

        subscriptions.push(console.bus().subscribe(topics::NOTICE, move |payload: &Payload| {
            if let Payload::Notice(notice) = payload {
                sink.borrow_mut().on_notice(notice);
            }
            Ok(())
        }));

        Self { subscriptions }
    }

    pub fn detach(&mut self) {
        for subscription in &mut self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

/// Reads stdin lines on a background task.
///
/// The channel closes at end of input.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    warn!(error = %error, "Failed to read stdin");
                    break;
                }
            }
        }
        debug!("Stdin reader finished");
    });
    rx
}

/// Runs the console until `quit`, `shutdown` resolves, or the transport
/// stops.
///
/// Transport events and command lines are applied one at a time, so this
/// loop is the only place the session state changes. Input ending does not
/// stop the loop; inbound messages keep being shown.
pub async fn drive<F>(
    console: &Console,
    events: &mut mpsc::UnboundedReceiver<TransportEvent>,
    lines: &mut mpsc::UnboundedReceiver<String>,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut input_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(error) = console.apply(event) {
                        warn!(error = %error, "Failed to apply transport event");
                    }
                }
                None => {
                    debug!("Transport channel closed");
                    break;
                }
            },
            line = lines.recv(), if input_open => match line {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if console.run_line(&line) == CommandOutcome::Quit {
                        break;
                    }
                }
                None => input_open = false,
            },
            () = &mut shutdown => {
                debug!("Shutdown requested");
                break;
            }
        }
    }
}
