//! Main application loop for the TUI.

use crate::input::{Action, InputRouter, RouteResult};
use crate::state::TuiState;
use crate::widgets::{footer, header, help, messages};
use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
};
use scopeguard::defer;
use sioscope_core::{CommandOutcome, Console, ConsoleCommand, Notice, TransportEvent};
use std::cell::RefCell;
use std::future::Future;
use std::io;
use std::rc::Rc;
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};
use tracing::{debug, warn};

/// Main TUI application.
pub struct App<'a> {
    console: &'a Console,
    state: Rc<RefCell<TuiState>>,
    input_router: InputRouter,
}

impl<'a> App<'a> {
    /// Creates a new App over `console`, rendering from `state`.
    pub fn new(console: &'a Console, state: Rc<RefCell<TuiState>>) -> Self {
        Self {
            console,
            state,
            input_router: InputRouter::new(),
        }
    }

    /// Runs the TUI event loop until quit or `shutdown` resolves.
    pub async fn run<F>(
        mut self,
        events: &mut mpsc::UnboundedReceiver<TransportEvent>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal on every exit path, including panics and
        // task cancellation.
        defer! {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
        }

        tokio::pin!(shutdown);
        let mut tick = interval(Duration::from_millis(100));
        let mut transport_open = true;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.state.borrow_mut().connection = self.console.connection();
                    {
                        let state = self.state.borrow();
                        terminal.draw(|f| draw(f, &state))?;
                    }

                    let mut quit = false;
                    while !quit && event::poll(Duration::from_millis(0))? {
                        if let Event::Key(key) = event::read()? {
                            if key.kind == KeyEventKind::Press {
                                quit = self.handle_key(key);
                            }
                        }
                    }
                    if quit {
                        break;
                    }
                }
                event = events.recv(), if transport_open => match event {
                    Some(event) => {
                        if let Err(error) = self.console.apply(event) {
                            warn!(error = %error, "Failed to apply transport event");
                        }
                    }
                    None => {
                        debug!("Transport channel closed");
                        transport_open = false;
                    }
                },
                () = &mut shutdown => {
                    debug!("Shutdown requested");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handles one key press. Returns true when the app should quit.
    ///
    /// No `TuiState` borrow is held while calling into the console, since
    /// console calls publish to handlers that update the state.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        {
            let mut state = self.state.borrow_mut();
            if state.notice_open {
                state.notice_open = false;
                return false;
            }
        }

        match self.input_router.route_key(key) {
            RouteResult::Action(action) => return self.apply_action(action),
            RouteResult::EnterCommand => {
                self.state.borrow_mut().command_line = Some(String::new());
            }
            RouteResult::Edit(text) => self.state.borrow_mut().command_line = Some(text),
            RouteResult::Cancel => self.state.borrow_mut().command_line = None,
            RouteResult::Execute(line) => {
                self.state.borrow_mut().command_line = None;
                if !line.trim().is_empty() && self.console.run_line(&line) == CommandOutcome::Quit
                {
                    return true;
                }
            }
            RouteResult::Consumed => {}
        }
        false
    }

    fn apply_action(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,
            Action::Help => {
                let mut state = self.state.borrow_mut();
                state.show_help = !state.show_help;
            }
            Action::Clear => self.execute(ConsoleCommand::Clear),
            Action::Restart => self.execute(ConsoleCommand::Restart),
            Action::ClearFilter => self.execute(ConsoleCommand::Filter(Vec::new())),
            Action::ToggleSelectedTag => {
                let tag = self.state.borrow().selected_message().map(|m| m.tag.clone());
                if let Some(tag) = tag {
                    self.console.toggle_filter(&tag);
                }
            }
            Action::SelectNext => self.state.borrow_mut().select_next(),
            Action::SelectPrev => self.state.borrow_mut().select_prev(),
            Action::SelectFirst => self.state.borrow_mut().select_first(),
            Action::SelectLast => self.state.borrow_mut().select_last(),
            Action::Expand => self.state.borrow_mut().toggle_expanded(),
        }
        false
    }

    fn execute(&self, command: ConsoleCommand) {
        if let Err(error) = self.console.execute(command) {
            self.console.notify(Notice::error(error.to_string()));
        }
    }
}

/// Draws one frame from `state`.
pub fn draw(f: &mut Frame, state: &TuiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    f.render_widget(header::render(state), chunks[0]);
    let mut list_state = messages::list_state(state);
    f.render_stateful_widget(messages::render(state), chunks[1], &mut list_state);
    f.render_widget(footer::render(state), chunks[2]);

    if state.show_help {
        help::render(f, f.area());
    } else if state.notice_open {
        if let Some(notice) = &state.notice {
            help::render_notice(f, f.area(), &notice.text);
        }
    }
}
