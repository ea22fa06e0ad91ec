//! State management for the TUI.

use sioscope_core::{ConnectionStatus, Message, Notice, SessionState};
use std::rc::Rc;

/// View state derived from console snapshots and notices.
pub struct TuiState {
    /// Latest session snapshot.
    pub session: SessionState,
    /// Connection status as of the last redraw.
    pub connection: ConnectionStatus,
    /// Most recent operator notice.
    pub notice: Option<Notice>,
    /// Index into the visible messages.
    pub selected: Option<usize>,
    /// Whether the selected message shows its full content.
    pub expanded: bool,
    /// Keeps the selection on the newest message as messages arrive.
    pub follow: bool,
    /// Whether to show the help overlay.
    pub show_help: bool,
    /// Whether the latest multi-line notice is shown in a popup.
    pub notice_open: bool,
    /// Command line being typed, if in command mode.
    pub command_line: Option<String>,
}

impl TuiState {
    /// Creates empty state.
    pub fn new() -> Self {
        Self {
            session: SessionState::default(),
            connection: ConnectionStatus::Disconnected,
            notice: None,
            selected: None,
            expanded: false,
            follow: true,
            show_help: false,
            notice_open: false,
            command_line: None,
        }
    }

    /// Replaces the snapshot, keeping the selection valid.
    pub fn apply_snapshot(&mut self, session: SessionState) {
        self.session = session;
        let count = self.session.visible_count();
        if count == 0 {
            self.selected = None;
            self.expanded = false;
        } else if self.follow || self.selected.is_none() {
            self.selected = Some(count - 1);
        } else if let Some(index) = self.selected {
            self.selected = Some(index.min(count - 1));
        }
    }

    /// Records a notice. Multi-line notices open the notice popup.
    pub fn set_notice(&mut self, notice: Notice) {
        self.notice_open = notice.text.contains('\n');
        self.notice = Some(notice);
    }

    /// Messages passing the active filter.
    pub fn visible(&self) -> Vec<Rc<Message>> {
        self.session.visible_messages().cloned().collect()
    }

    /// The message under the cursor.
    pub fn selected_message(&self) -> Option<Rc<Message>> {
        let index = self.selected?;
        self.session.visible_messages().nth(index).cloned()
    }

    pub fn select_next(&mut self) {
        let count = self.session.visible_count();
        if count == 0 {
            return;
        }
        let next = self.selected.map_or(0, |i| (i + 1).min(count - 1));
        self.selected = Some(next);
        self.follow = next == count - 1;
    }

    pub fn select_prev(&mut self) {
        if self.session.visible_count() == 0 {
            return;
        }
        self.selected = Some(self.selected.map_or(0, |i| i.saturating_sub(1)));
        self.follow = false;
    }

    pub fn select_first(&mut self) {
        if self.session.visible_count() > 0 {
            self.selected = Some(0);
            self.follow = false;
        }
    }

    pub fn select_last(&mut self) {
        let count = self.session.visible_count();
        if count > 0 {
            self.selected = Some(count - 1);
            self.follow = true;
        }
    }

    pub fn toggle_expanded(&mut self) {
        if self.selected.is_some() {
            self.expanded = !self.expanded;
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sioscope_core::{Console, RawInbound};

    fn session_with(tags: &[&str]) -> SessionState {
        let console = Console::default();
        for tag in tags {
            console
                .ingest(RawInbound::Payload(json!({ "event": tag })))
                .unwrap();
        }
        console.state()
    }

    #[test]
    fn test_follow_tracks_newest_message() {
        let mut state = TuiState::new();
        state.apply_snapshot(session_with(&["a", "b"]));
        assert_eq!(state.selected, Some(1));

        state.apply_snapshot(session_with(&["a", "b", "c"]));
        assert_eq!(state.selected, Some(2));
    }

    #[test]
    fn test_moving_up_stops_following() {
        let mut state = TuiState::new();
        state.apply_snapshot(session_with(&["a", "b", "c"]));
        state.select_prev();
        state.select_prev();
        state.select_prev();
        assert_eq!(state.selected, Some(0));
        assert!(!state.follow);

        state.apply_snapshot(session_with(&["a", "b", "c", "d"]));
        assert_eq!(state.selected, Some(0));

        state.select_last();
        assert!(state.follow);
        assert_eq!(state.selected_message().unwrap().tag, "d");
    }

    #[test]
    fn test_selection_is_clamped_and_cleared() {
        let mut state = TuiState::new();
        state.apply_snapshot(session_with(&["a", "b", "c"]));
        state.select_prev();
        state.expanded = true;

        state.apply_snapshot(session_with(&["a"]));
        assert_eq!(state.selected, Some(0));

        state.apply_snapshot(SessionState::default());
        assert_eq!(state.selected, None);
        assert!(!state.expanded);
        assert!(state.selected_message().is_none());
    }

    #[test]
    fn test_multi_line_notice_opens_popup() {
        let mut state = TuiState::new();
        state.set_notice(Notice::info("one line"));
        assert!(!state.notice_open);

        state.set_notice(Notice::info("{\n  \"a\": 1\n}"));
        assert!(state.notice_open);
    }

    #[test]
    fn test_navigation_on_empty_state_is_noop() {
        let mut state = TuiState::new();
        state.select_next();
        state.select_prev();
        state.toggle_expanded();
        assert_eq!(state.selected, None);
        assert!(!state.expanded);
    }
}
