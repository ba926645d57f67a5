//! Key-value panel rendering

use super::field_renderer::kv_line;
use crate::state::KvPanel;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Draw a panel of labeled inputs. `focused` is the input being edited, if any.
pub fn draw_kv_panel(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    panel: &KvPanel,
    focused: Option<usize>,
) {
    let border_color = if focused.is_some() {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let block = Block::default()
        .title(format!(" {title} ({}) ", panel.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    if panel.is_empty() {
        let empty = Paragraph::new("No data")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let label_width = panel
        .inputs()
        .iter()
        .map(|f| f.label.chars().count())
        .max()
        .unwrap_or(0)
        .min(usize::from(area.width / 2));

    let visible = usize::from(area.height.saturating_sub(2));
    let offset = scroll_offset(focused.unwrap_or(0), visible);

    let lines: Vec<Line> = panel
        .inputs()
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(i, field)| kv_line(field, label_width, focused == Some(i)))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// First row to show so that row `active` is within `visible` rows
fn scroll_offset(active: usize, visible: usize) -> usize {
    if visible == 0 {
        return active;
    }
    (active + 1).saturating_sub(visible)
}
