//! Message list. One line per visible message; the selected message can be
//! expanded to its full content.

use crate::state::TuiState;
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState},
};
use sioscope_core::{Message, MessageOrigin};

pub fn render(state: &TuiState) -> List<'static> {
    let items: Vec<ListItem<'static>> = state
        .visible()
        .iter()
        .enumerate()
        .map(|(index, message)| {
            let expanded = state.expanded && state.selected == Some(index);
            ListItem::new(item_text(message, expanded))
        })
        .collect();

    let title = if state.follow { " messages (following) " } else { " messages " };
    List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
}

/// Selection to pair with [`render`].
pub fn list_state(state: &TuiState) -> ListState {
    ListState::default().with_selected(state.selected)
}

fn item_text(message: &Message, expanded: bool) -> Text<'static> {
    let header = Line::from(vec![
        Span::styled(
            format!("#{} ", message.received_order),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(message.tag.clone(), tag_style(message)),
        Span::raw(" "),
        Span::raw(if expanded {
            message.received_at.format("%H:%M:%S%.3f").to_string()
        } else {
            message.compact_content.clone()
        }),
    ]);

    if !expanded {
        return Text::from(header);
    }

    let mut lines = vec![header];
    lines.extend(
        message
            .full_content
            .lines()
            .map(|line| Line::raw(format!("    {line}"))),
    );
    Text::from(lines)
}

fn tag_style(message: &Message) -> Style {
    let color = match (message.origin, message.tag.as_str()) {
        (_, "error") => Color::Red,
        (MessageOrigin::Transport, _) | (_, "status") => Color::Blue,
        (MessageOrigin::Local, _) => Color::Magenta,
        (MessageOrigin::Remote, _) => Color::Yellow,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}
