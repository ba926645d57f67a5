//! Preview/recalc analysis view

use super::forms::{draw_field, draw_kv_panel};
use super::spinner_frame;
use crate::app::App;
use crate::shortcuts::{HIDE_DEBUG_SHORTCUT, PREVIEW_SHORTCUT, RECALC_SHORTCUT};
use crate::state::{AnalysisTarget, RecalcReport, Section};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Draw the analysis view
pub fn draw(frame: &mut Frame, area: Rect, app: &App) {
    let debug_height = if app.state.debug_text.is_some() { 8 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // File and language inputs
            Constraint::Min(8),               // Report panels
            Constraint::Length(6),            // Result
            Constraint::Length(debug_height), // Debug
        ])
        .split(area);

    draw_inputs(frame, chunks[0], app);
    draw_panels(frame, chunks[1], app);
    draw_result(frame, chunks[2], app);
    if let Some(debug) = &app.state.debug_text {
        draw_debug(frame, chunks[3], debug);
    }
}

fn draw_inputs(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(20),    // PDF path
            Constraint::Length(14), // Language
            Constraint::Length(32), // Activity
        ])
        .split(area);

    let workflow = &app.state.workflow;
    let target = app.state.analysis_target();
    draw_field(
        frame,
        chunks[0],
        &workflow.file_path,
        target == AnalysisTarget::FilePath,
    );
    draw_field(frame, chunks[1], &workflow.lang, target == AnalysisTarget::Lang);

    let activity = if workflow.is_previewing() {
        Span::styled(
            format!("{} Uploading...", spinner_frame()),
            Style::default().fg(Color::Yellow),
        )
    } else if workflow.is_recalculating() {
        Span::styled(
            format!("{} Recalculating...", spinner_frame()),
            Style::default().fg(Color::Yellow),
        )
    } else if let Some(snapshot) = workflow.snapshot() {
        Span::styled(
            format!(
                "{} @ {}",
                snapshot.saved_pdf,
                snapshot.received_at.format("%H:%M:%S")
            ),
            Style::default().fg(Color::Green),
        )
    } else {
        Span::styled("No preview yet", Style::default().fg(Color::DarkGray))
    };
    let block = Block::default()
        .title(" Preview ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(Line::from(activity)).block(block), chunks[2]);
}

/// Four panels in a 2x2 grid: previous year on the left, current on the right
fn draw_panels(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let focused = match app.state.analysis_target() {
        AnalysisTarget::Input(section, _) => Some(section),
        _ => None,
    };

    for (row, pair) in rows.iter().zip(Section::ALL.chunks(2)) {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(*row);
        for (cell, &section) in cells.iter().zip(pair) {
            let panel = app.state.workflow.panel(section);
            let active = (focused == Some(section)).then(|| panel.active_index());
            draw_kv_panel(frame, *cell, section.title(), panel, active);
        }
    }
}

fn draw_result(frame: &mut Frame, area: Rect, app: &App) {
    let workflow = &app.state.workflow;
    let block = Block::default()
        .title(" Result ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let lines = match workflow.report() {
        Some(report) => report_lines(report),
        None if workflow.snapshot().is_some() => vec![Line::from(Span::styled(
            format!("Edit the figures, then {RECALC_SHORTCUT} to recalculate"),
            Style::default().fg(Color::DarkGray),
        ))],
        None => vec![Line::from(Span::styled(
            format!("Enter a PDF path, then Enter or {PREVIEW_SHORTCUT} for a preview"),
            Style::default().fg(Color::DarkGray),
        ))],
    };

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(block),
        area,
    );
}

fn report_lines(report: &RecalcReport) -> Vec<Line<'_>> {
    let mut decision = vec![Span::styled(
        report.decision_label(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(text) = report.decision.as_deref().filter(|t| !t.is_empty()) {
        decision.push(Span::raw(format!("  {text}")));
    }

    let mut lines = vec![
        Line::from(decision),
        Line::from(format!(
            "{}    {}",
            report.risk_label(),
            report.equity_label()
        )),
    ];
    if let Some(docx) = &report.docx_file {
        lines.push(Line::from(Span::styled(
            format!("Report: {docx}"),
            Style::default().fg(Color::Blue),
        )));
    }
    lines
}

fn draw_debug(frame: &mut Frame, area: Rect, debug: &str) {
    let block = Block::default()
        .title(format!(" Debug ({HIDE_DEBUG_SHORTCUT} to hide) "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    frame.render_widget(
        Paragraph::new(debug)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: false })
            .block(block),
        area,
    );
}
