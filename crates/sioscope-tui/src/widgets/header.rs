use crate::state::TuiState;
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use sioscope_core::ConnectionStatus;

pub fn render(state: &TuiState) -> Paragraph<'static> {
    let mut spans = vec![Span::raw("sioscope | ")];

    let connection = match state.connection {
        ConnectionStatus::Connected => Span::styled("● connected", Style::default().fg(Color::Green)),
        ConnectionStatus::Connecting => {
            Span::styled("◌ connecting", Style::default().fg(Color::Yellow))
        }
        ConnectionStatus::Disconnected => {
            Span::styled("○ disconnected", Style::default().fg(Color::Red))
        }
    };
    spans.push(connection);

    // | N messages (M shown)
    let total = state.session.messages.len();
    let shown = state.session.visible_count();
    if shown == total {
        spans.push(Span::raw(format!(" | {total} messages")));
    } else {
        spans.push(Span::raw(format!(" | {total} messages ({shown} shown)")));
    }

    spans.push(Span::raw(format!(" | {} tags", state.session.known_tags.len())));

    if !state.session.active_filter.is_empty() {
        let tags: Vec<&str> = state.session.active_filter.iter().map(String::as_str).collect();
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("filter: {}", tags.join(", ")),
            Style::default().fg(Color::Cyan),
        ));
    }

    let line = Line::from(spans);
    Paragraph::new(line).block(Block::default().borders(Borders::ALL))
}
