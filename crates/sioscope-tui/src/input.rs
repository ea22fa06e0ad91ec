//! Input routing between normal mode and the command line.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Input routing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
}

/// Single-key actions available in normal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Help,
    Clear,
    Restart,
    ClearFilter,
    ToggleSelectedTag,
    SelectNext,
    SelectPrev,
    SelectFirst,
    SelectLast,
    Expand,
}

/// Result of routing a key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteResult {
    Action(Action),
    /// Command mode was entered.
    EnterCommand,
    /// The command line changed; carries the current text.
    Edit(String),
    /// Enter was pressed in command mode.
    Execute(String),
    /// Esc was pressed in command mode.
    Cancel,
    Consumed,
}

/// Routes keys and owns the command line buffer.
pub struct InputRouter {
    mode: InputMode,
    buffer: String,
}

impl InputRouter {
    pub fn new() -> Self {
        Self {
            mode: InputMode::Normal,
            buffer: String::new(),
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Routes a key event based on current mode.
    pub fn route_key(&mut self, key: KeyEvent) -> RouteResult {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return RouteResult::Action(Action::Quit);
        }

        match self.mode {
            InputMode::Normal => match key.code {
                KeyCode::Char(':') => {
                    self.mode = InputMode::Command;
                    self.buffer.clear();
                    RouteResult::EnterCommand
                }
                KeyCode::Char('q') => RouteResult::Action(Action::Quit),
                KeyCode::Char('?') => RouteResult::Action(Action::Help),
                KeyCode::Char('c') => RouteResult::Action(Action::Clear),
                KeyCode::Char('r') => RouteResult::Action(Action::Restart),
                KeyCode::Char('f') => RouteResult::Action(Action::ClearFilter),
                KeyCode::Char('t') => RouteResult::Action(Action::ToggleSelectedTag),
                KeyCode::Char('j') | KeyCode::Down => RouteResult::Action(Action::SelectNext),
                KeyCode::Char('k') | KeyCode::Up => RouteResult::Action(Action::SelectPrev),
                KeyCode::Char('g') | KeyCode::Home => RouteResult::Action(Action::SelectFirst),
                KeyCode::Char('G') | KeyCode::End => RouteResult::Action(Action::SelectLast),
                KeyCode::Enter | KeyCode::Char(' ') => RouteResult::Action(Action::Expand),
                _ => RouteResult::Consumed,
            },
            InputMode::Command => match key.code {
                KeyCode::Enter => {
                    self.mode = InputMode::Normal;
                    RouteResult::Execute(std::mem::take(&mut self.buffer))
                }
                KeyCode::Esc => {
                    self.mode = InputMode::Normal;
                    self.buffer.clear();
                    RouteResult::Cancel
                }
                KeyCode::Backspace => {
                    self.buffer.pop();
                    RouteResult::Edit(self.buffer.clone())
                }
                KeyCode::Char(c) => {
                    self.buffer.push(c);
                    RouteResult::Edit(self.buffer.clone())
                }
                _ => RouteResult::Consumed,
            },
        }
    }
}

impl Default for InputRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_normal_mode_keys() {
        let mut router = InputRouter::new();
        assert_eq!(router.route_key(key(KeyCode::Char('q'))), RouteResult::Action(Action::Quit));
        assert_eq!(router.route_key(key(KeyCode::Down)), RouteResult::Action(Action::SelectNext));
        assert_eq!(router.route_key(key(KeyCode::Char('k'))), RouteResult::Action(Action::SelectPrev));
        assert_eq!(router.route_key(key(KeyCode::Char(' '))), RouteResult::Action(Action::Expand));
        assert_eq!(router.route_key(key(KeyCode::Char('t'))), RouteResult::Action(Action::ToggleSelectedTag));
        assert_eq!(router.route_key(key(KeyCode::Char('x'))), RouteResult::Consumed);
    }

    #[test]
    fn test_command_mode_collects_and_executes() {
        let mut router = InputRouter::new();
        assert_eq!(router.route_key(key(KeyCode::Char(':'))), RouteResult::EnterCommand);
        assert_eq!(router.mode(), InputMode::Command);

        for c in "clearx".chars() {
            router.route_key(key(KeyCode::Char(c)));
        }
        assert_eq!(router.route_key(key(KeyCode::Backspace)), RouteResult::Edit("clear".to_string()));
        assert_eq!(router.route_key(key(KeyCode::Enter)), RouteResult::Execute("clear".to_string()));
        assert_eq!(router.mode(), InputMode::Normal);
    }

    #[test]
    fn test_letters_are_text_in_command_mode() {
        let mut router = InputRouter::new();
        router.route_key(key(KeyCode::Char(':')));
        assert_eq!(router.route_key(key(KeyCode::Char('q'))), RouteResult::Edit("q".to_string()));
    }

    #[test]
    fn test_escape_cancels_and_clears() {
        let mut router = InputRouter::new();
        router.route_key(key(KeyCode::Char(':')));
        router.route_key(key(KeyCode::Char('x')));
        assert_eq!(router.route_key(key(KeyCode::Esc)), RouteResult::Cancel);

        router.route_key(key(KeyCode::Char(':')));
        assert_eq!(router.route_key(key(KeyCode::Enter)), RouteResult::Execute(String::new()));
    }

    #[test]
    fn test_ctrl_c_quits_in_any_mode() {
        let mut router = InputRouter::new();
        router.route_key(key(KeyCode::Char(':')));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(router.route_key(ctrl_c), RouteResult::Action(Action::Quit));
    }
}
