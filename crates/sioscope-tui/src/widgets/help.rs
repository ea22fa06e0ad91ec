//! Centered popups: key help and multi-line notices.

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use sioscope_core::HELP_TEXT;

const KEYS: &str = "\
:            enter a command (Enter runs, Esc cancels)
j/k, ↑/↓     move selection
g/G          first / last message
Enter/Space  expand or collapse the selected message
t            toggle the selected message's tag in the filter
f            clear the filter
c            clear all messages
r            restart the connection
?            toggle this help
q            quit";

/// Renders the help overlay.
pub fn render(f: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = KEYS.lines().map(Line::raw).collect();
    lines.push(Line::raw(""));
    lines.push(Line::styled("Commands", Style::default().fg(Color::Cyan)));
    lines.extend(HELP_TEXT.lines().map(Line::raw));
    popup(f, area, " help ", lines);
}

/// Renders a notice popup; any key closes it.
pub fn render_notice(f: &mut Frame, area: Rect, text: &str) {
    let lines: Vec<Line> = text.lines().map(Line::raw).collect();
    popup(f, area, " notice (any key closes) ", lines);
}

fn popup(f: &mut Frame, area: Rect, title: &'static str, lines: Vec<Line>) {
    let height = (lines.len() as u16).saturating_add(2).min(area.height);
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [popup_area] = Layout::horizontal([Constraint::Percentage(80)])
        .flex(Flex::Center)
        .areas(row);

    f.render_widget(Clear, popup_area);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(title)),
        popup_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(render_fn: impl FnOnce(&mut Frame)) -> String {
        let backend = TestBackend::new(100, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(render_fn).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn help_lists_keys_and_commands() {
        let text = draw(|f| render(f, f.area()));
        assert!(text.contains("toggle this help"));
        assert!(text.contains("send <Builder>"));
    }

    #[test]
    fn notice_popup_shows_every_line() {
        let text = draw(|f| render_notice(f, f.area(), "first line\nsecond line"));
        assert!(text.contains("first line"));
        assert!(text.contains("second line"));
    }
}
