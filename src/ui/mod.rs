//! UI module for rendering the TUI

mod analysis;
mod components;
mod forms;
mod layout;

use crate::app::App;
use crate::state::View;
use components::render_error_dialog;
use ratatui::Frame;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner glyph for the current tenth of a second
pub fn spinner_frame() -> &'static str {
    let tenth = chrono::Local::now().timestamp_subsec_millis() / 100;
    SPINNER_FRAMES[tenth as usize % SPINNER_FRAMES.len()]
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Draw the main layout with sidebar
    let (sidebar_area, main_area) = layout::create_layout(area);

    layout::draw_sidebar(frame, sidebar_area, app);

    match app.state.current_view {
        View::Analysis => analysis::draw(frame, main_area, app),
        View::Form(_) => {
            if let Some(bound) = app.state.current_form() {
                forms::draw_submit_form(frame, main_area, bound);
            }
        }
    }

    layout::draw_status_bar(frame, app);

    // Blocking error dialog on top of everything
    if let Some(message) = app.state.current_error() {
        render_error_dialog(frame, message, app.state.pending_errors());
    }
}
