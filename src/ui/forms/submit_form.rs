//! Bound form rendering

use super::field_renderer::draw_field;
use crate::state::{BoundForm, StatusClass, StatusLine, SubmissionPhase};
use crate::ui::components::{render_button, BUTTON_HEIGHT};
use crate::ui::spinner_frame;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Draw a form with its submit button and status line
pub fn draw_submit_form(frame: &mut Frame, area: Rect, bound: &BoundForm) {
    let form = bound.form();
    let border_color = match form.phase() {
        SubmissionPhase::Idle => Color::Cyan,
        SubmissionPhase::Submitting => Color::Yellow,
        SubmissionPhase::Succeeded => Color::Green,
        SubmissionPhase::Failed => Color::Red,
    };

    let block = Block::default()
        .title(format!(" {} ", form.title))
        .title_bottom(Line::from(Span::styled(
            format!(" POST {} ", bound.endpoint()),
            Style::default().fg(Color::DarkGray),
        )))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    frame.render_widget(block, area);

    let mut constraints: Vec<Constraint> = form
        .fields
        .iter()
        .map(|f| Constraint::Length(if f.is_multiline { 6 } else { 3 }))
        .collect();
    constraints.push(Constraint::Length(BUTTON_HEIGHT)); // Submit button
    constraints.push(Constraint::Length(1)); // Status line
    constraints.push(Constraint::Min(0));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .margin(1)
        .split(area);

    for (idx, field) in form.fields.iter().enumerate() {
        draw_field(frame, chunks[idx], field, idx == form.active_index());
    }

    let button_row = chunks[form.fields.len()];
    let button_area = Rect {
        width: button_row.width.min(24),
        ..button_row
    };
    let label = if form.control.is_disabled() {
        format!("{} {}", spinner_frame(), form.control.label())
    } else {
        form.control.label().to_string()
    };
    render_button(frame, button_area, &label, true, !form.control.is_disabled());

    let status_area = chunks[form.fields.len() + 1];
    frame.render_widget(Paragraph::new(status_line(&form.status)), status_area);
}

fn status_line(status: &StatusLine) -> Line<'_> {
    let color = match status.class {
        StatusClass::Muted => Color::DarkGray,
        StatusClass::Success => Color::Green,
        StatusClass::Failure => Color::Red,
    };
    Line::from(Span::styled(
        format!(" {}", status.text),
        Style::default().fg(color),
    ))
}
