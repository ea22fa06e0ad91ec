//! The console context: bus, store, registries and service, wired together.
//!
//! A `Console` is single-threaded. Presentations subscribe to its bus and
//! call [`Console::run_line`]; the driver loop feeds it transport events with
//! [`Console::apply`], one at a time.

use crate::builder::BuilderRegistry;
use crate::command::{ConsoleCommand, HELP_TEXT, parse_command};
use crate::config::SioscopeConfig;
use crate::error::{Error, Result};
use crate::formatter::{FormattedContent, FormatterRegistry};
use crate::ingest::{RawInbound, echo_record, prepare};
use crate::message::{LifecycleEnvelope, Message};
use crate::payload::{Bus, Notice, Payload};
use crate::service::ServiceLayer;
use crate::store::{SessionState, Store};
use crate::topics;
use crate::transport::{TransportCommand, TransportEvent};
use indexmap::IndexSet;
use serde_json::Value;
use sioscope_proto::Subscription;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// State of the transport connection, as last reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        };
        f.write_str(label)
    }
}

/// Whether the driver loop should keep going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Quit,
}

/// The console context.
pub struct Console {
    bus: Rc<Bus>,
    store: Rc<Store>,
    formatters: RefCell<FormatterRegistry>,
    builders: BuilderRegistry,
    subscriptions: RefCell<Vec<Subscription>>,
    service: RefCell<Option<ServiceLayer>>,
    commands: RefCell<Option<UnboundedSender<TransportCommand>>>,
    connection: Cell<ConnectionStatus>,
}

impl Console {
    /// Creates a console using `builders`, with the built-in formatters.
    ///
    /// Wires `ui:clearMessages` and `ui:updateFilter` to the store.
    pub fn new(builders: BuilderRegistry) -> Self {
        let bus = Rc::new(Bus::new());
        let store = Rc::new(Store::new(Rc::clone(&bus)));
        let mut subscriptions = Vec::new();

        let weak = Rc::downgrade(&store);
        subscriptions.push(bus.subscribe(topics::CLEAR_MESSAGES, move |_: &Payload| {
            match weak.upgrade() {
                Some(store) => store.clear_messages().map_err(Into::into),
                None => Ok(()),
            }
        }));

        let weak = Rc::downgrade(&store);
        subscriptions.push(bus.subscribe(topics::UPDATE_FILTER, move |payload: &Payload| {
            let Payload::Filter(filter) = payload else {
                return Err("ui:updateFilter expects a filter payload".into());
            };
            match weak.upgrade() {
                Some(store) => store.update_selected_events(filter.clone()).map_err(Into::into),
                None => Ok(()),
            }
        }));

        Self {
            bus,
            store,
            formatters: RefCell::new(FormatterRegistry::with_builtin()),
            builders,
            subscriptions: RefCell::new(subscriptions),
            service: RefCell::new(None),
            commands: RefCell::new(None),
            connection: Cell::new(ConnectionStatus::Disconnected),
        }
    }

    /// Creates a console with the bundled builders plus those from `config`.
    pub fn from_config(config: &SioscopeConfig) -> Self {
        let mut builders = BuilderRegistry::bundled();
        builders.extend(config.builder_templates());
        Self::new(builders)
    }

    pub fn bus(&self) -> &Rc<Bus> {
        &self.bus
    }

    pub fn store(&self) -> &Rc<Store> {
        &self.store
    }

    pub fn builders(&self) -> &BuilderRegistry {
        &self.builders
    }

    /// Current session snapshot.
    pub fn state(&self) -> SessionState {
        self.store.get_state()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection.get()
    }

    /// Registers a formatter for `tag`. Messages already stored keep their
    /// display strings.
    pub fn register_formatter<F>(&self, tag: impl Into<String>, formatter: F)
    where
        F: Fn(&Value) -> FormattedContent + 'static,
    {
        self.formatters.borrow_mut().register(tag, formatter);
    }

    /// Connects the service layer to a transport's command channel.
    pub fn attach_transport(&self, commands: UnboundedSender<TransportCommand>) {
        if let Some(mut previous) = self.service.borrow_mut().take() {
            previous.detach();
        }
        *self.service.borrow_mut() = Some(ServiceLayer::attach(&self.bus, commands.clone()));
        *self.commands.borrow_mut() = Some(commands);
        self.connection.set(ConnectionStatus::Connecting);
    }

    /// Tags, formats and stores `raw`.
    pub fn ingest(&self, raw: RawInbound) -> Result<Rc<Message>> {
        let pending = prepare(raw, &self.formatters.borrow());
        self.store.add_message(pending)
    }

    /// Applies one transport event.
    pub fn apply(&self, event: TransportEvent) -> Result<()> {
        match event {
            TransportEvent::Frame(text) => {
                self.ingest(RawInbound::Frame(text))?;
            }
            TransportEvent::Connected => {
                info!("Transport connected");
                self.connection.set(ConnectionStatus::Connected);
                self.ingest(RawInbound::Lifecycle(LifecycleEnvelope::status(
                    "WebSocket connected!",
                )))?;
            }
            TransportEvent::Disconnected => {
                info!("Transport disconnected");
                self.connection.set(ConnectionStatus::Disconnected);
                self.ingest(RawInbound::Lifecycle(LifecycleEnvelope::status(
                    "WebSocket disconnected!",
                )))?;
            }
            TransportEvent::Error(error) => {
                warn!(error = %error, "Transport error");
                // A failed connect leaves nothing in progress
                if self.connection.get() != ConnectionStatus::Connected {
                    self.connection.set(ConnectionStatus::Disconnected);
                }
                self.notify(Notice::error(Error::Transport(error.clone()).to_string()));
                self.ingest(RawInbound::Lifecycle(LifecycleEnvelope::error(format!(
                    "WebSocket error: {error}"
                ))))?;
            }
            TransportEvent::SendCompleted(payload) => {
                debug!("Send completed");
                self.ingest(RawInbound::Echo(echo_record(&payload)))?;
            }
            TransportEvent::SendFailed { payload, error } => {
                warn!(error = %error, payload = %payload, "Send failed");
                self.notify(Notice::error(Error::SendFailure(error).to_string()));
            }
            TransportEvent::RestartCompleted => {
                info!("Transport restarted");
                self.notify(Notice::info("Connection restarted"));
            }
            TransportEvent::RestartFailed(error) => {
                warn!(error = %error, "Transport restart failed");
                self.connection.set(ConnectionStatus::Disconnected);
                self.notify(Notice::error(format!("restart failed: {error}")));
            }
        }
        Ok(())
    }

    /// Publishes an operator notice.
    pub fn notify(&self, notice: Notice) {
        self.bus.publish(topics::NOTICE, &Payload::Notice(notice));
    }

    /// Executes a parsed command.
    pub fn execute(&self, command: ConsoleCommand) -> Result<CommandOutcome> {
        match command {
            ConsoleCommand::Builders => {
                self.notify(Notice::info(self.builders.list().join(", ")));
            }
            ConsoleCommand::Fields(builder) => {
                let fields = self.builders.fields_of(&builder)?;
                let text = if fields.is_empty() {
                    format!("{builder}: no fields")
                } else {
                    let listed: Vec<String> = fields
                        .iter()
                        .map(|(name, default)| format!("{name}={default:?}"))
                        .collect();
                    format!("{builder}: {}", listed.join(" "))
                };
                self.notify(Notice::info(text));
            }
            ConsoleCommand::Preview { builder, overrides } => {
                let preview = self.builders.preview(&builder, &overrides)?;
                self.notify(Notice::info(preview));
            }
            ConsoleCommand::Send { builder, overrides } => {
                let payload = self.builders.build_with_defaults(&builder, &overrides)?;
                self.send(payload);
            }
            ConsoleCommand::Json(raw) => {
                if raw.trim().is_empty() {
                    return Err(Error::InvalidCommand(
                        "message content cannot be empty".to_string(),
                    ));
                }
                let payload: Value = serde_json::from_str(&raw)?;
                self.send(payload);
            }
            ConsoleCommand::Format(raw) => {
                let payload: Value = serde_json::from_str(&raw)?;
                self.notify(Notice::info(format!("{payload:#}")));
            }
            ConsoleCommand::Filter(tags) => {
                self.bus.publish(
                    topics::UPDATE_FILTER,
                    &Payload::Filter(tags.into_iter().collect()),
                );
            }
            ConsoleCommand::Toggle(tag) => self.toggle_filter(&tag),
            ConsoleCommand::Clear => {
                self.bus.publish(topics::CLEAR_MESSAGES, &Payload::Empty);
            }
            ConsoleCommand::Restart => {
                self.bus.publish(topics::RESTART_CONNECTION, &Payload::Empty);
            }
            ConsoleCommand::Help => self.notify(Notice::info(HELP_TEXT)),
            ConsoleCommand::Quit => return Ok(CommandOutcome::Quit),
        }
        Ok(CommandOutcome::Continue)
    }

    /// Parses and executes `line`, reporting any failure as a notice.
    pub fn run_line(&self, line: &str) -> CommandOutcome {
        match parse_command(line).and_then(|command| self.execute(command)) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(line, error = %error, "Command failed");
                self.notify(Notice::error(error.to_string()));
                CommandOutcome::Continue
            }
        }
    }

    /// Adds `tag` to the active filter, or removes it if present.
    pub fn toggle_filter(&self, tag: &str) {
        let mut filter: IndexSet<String> = self.store.get_state().active_filter;
        if !filter.shift_remove(tag) {
            filter.insert(tag.to_string());
        }
        self.bus.publish(topics::UPDATE_FILTER, &Payload::Filter(filter));
    }

    fn send(&self, payload: Value) {
        self.bus.publish(topics::SEND_MESSAGE, &Payload::Outbound(payload));
    }

    /// Unsubscribes everything and asks the transport to stop.
    pub fn shutdown(&self) {
        if let Some(mut service) = self.service.borrow_mut().take() {
            service.detach();
        }
        for subscription in self.subscriptions.borrow_mut().iter_mut() {
            subscription.unsubscribe();
        }
        if let Some(commands) = self.commands.borrow_mut().take() {
            // Transport may already be gone
            let _ = commands.send(TransportCommand::Shutdown);
        }
        self.bus.clear();
        info!("Console shut down");
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(BuilderRegistry::bundled())
    }
}
