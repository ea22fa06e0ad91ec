use crate::state::TuiState;
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use sioscope_core::NoticeLevel;

const HINT: &str = ": command  j/k move  enter expand  t toggle tag  f clear filter  ? help  q quit";

pub fn render(state: &TuiState) -> Paragraph<'static> {
    let line = if let Some(buffer) = &state.command_line {
        Line::from(vec![
            Span::styled(":", Style::default().fg(Color::Cyan)),
            Span::raw(buffer.clone()),
            Span::styled("█", Style::default().fg(Color::Cyan)),
        ])
    } else if let Some(notice) = &state.notice {
        let color = match notice.level {
            NoticeLevel::Info => Color::Green,
            NoticeLevel::Warn => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        // Multi-line notices are shown in full in a popup
        let first = notice.text.lines().next().unwrap_or_default().to_string();
        Line::from(Span::styled(first, Style::default().fg(color)))
    } else {
        Line::from(Span::styled(HINT, Style::default().fg(Color::DarkGray)))
    };

    Paragraph::new(line).block(Block::default().borders(Borders::ALL))
}
