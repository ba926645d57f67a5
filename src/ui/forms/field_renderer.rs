//! Field rendering utilities for forms

use crate::state::FormField;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

const CURSOR: &str = "▌";

/// Draw a bordered form field
pub fn draw_field(frame: &mut Frame, area: Rect, field: &FormField, is_active: bool) {
    let (style, border_style) = if is_active {
        (Style::default().fg(Color::Cyan), Style::default().fg(Color::Cyan))
    } else {
        (Style::default(), Style::default().fg(Color::DarkGray))
    };
    let cursor = Span::styled(if is_active { CURSOR } else { "" }, Style::default().fg(Color::Cyan));

    let display_value = field.display_value();
    let content = if display_value.is_empty() && !is_active {
        Paragraph::new(Span::styled("(empty)", Style::default().fg(Color::DarkGray)))
    } else if field.is_multiline {
        // split('\n') keeps a trailing empty line so the cursor follows a fresh newline
        let mut lines: Vec<Line> = display_value
            .split('\n')
            .map(|l| Line::from(Span::styled(l.to_string(), style)))
            .collect();
        if let Some(last) = lines.last_mut() {
            last.spans.push(cursor);
        }
        Paragraph::new(lines)
    } else {
        Paragraph::new(Line::from(vec![Span::styled(display_value, style), cursor]))
    };

    let block = Block::default()
        .title(format!(" {} ", field.label))
        .borders(Borders::ALL)
        .border_style(border_style);

    frame.render_widget(content.wrap(Wrap { trim: false }).block(block), area);
}

/// One `label  value` row of a key-value panel, with the label padded to `label_width`
pub fn kv_line(field: &FormField, label_width: usize, is_active: bool) -> Line<'static> {
    let label_style = if is_active {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let value_style = if is_active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let mut spans = vec![
        Span::styled(format!("{:<label_width$}  ", field.label), label_style),
        Span::styled(field.display_value(), value_style),
    ];
    if is_active {
        spans.push(Span::styled(CURSOR, Style::default().fg(Color::Cyan)));
    }
    Line::from(spans)
}
