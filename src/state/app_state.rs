//! Application state definitions

use super::forms::{BoundForm, FormField, FormSubmitter, SubmitForm};
use super::workflow::{AnalysisWorkflow, Section};
use crate::config::ClientConfig;
use std::collections::VecDeque;
use std::fmt::Display;

/// Current view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Analysis,
    /// A bound form, by index
    Form(usize),
}

/// Input that receives typing in the analysis view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisTarget {
    FilePath,
    Lang,
    Input(Section, usize),
}

/// Main application state
pub struct AppState {
    // Navigation
    pub current_view: View,

    // Analysis view
    pub workflow: AnalysisWorkflow,
    pub analysis_focus: usize,

    // Bound forms, in binding order
    pub forms: Vec<BoundForm>,

    // UI state
    pub backend_connected: bool,
    pub status_message: Option<String>,
    /// Inline debug panel text of the last analysis failure
    pub debug_text: Option<String>,
    error_queue: VecDeque<String>,
}

impl AppState {
    pub fn new(config: &ClientConfig) -> Self {
        let forms = config
            .bindings
            .iter()
            .filter_map(|binding| {
                let form = config
                    .form(&binding.form)
                    .map(|def| SubmitForm::from_definition(def, &config.labels));
                if form.is_none() {
                    tracing::warn!(
                        "No form '{}' defined; binding to {} skipped",
                        binding.form,
                        binding.endpoint
                    );
                }
                FormSubmitter::bind(form, &binding.endpoint, &config.labels)
            })
            .collect();

        Self {
            current_view: View::default(),
            workflow: AnalysisWorkflow::new(config),
            analysis_focus: 0,
            forms,
            backend_connected: false,
            status_message: None,
            debug_text: None,
            error_queue: VecDeque::new(),
        }
    }

    /// Switch views by sidebar position: 0 is the analysis view, then forms
    pub fn select_view(&mut self, index: usize) {
        if index == 0 {
            self.current_view = View::Analysis;
        } else if index <= self.forms.len() {
            self.current_view = View::Form(index - 1);
        }
    }

    /// Sidebar position of the current view
    pub fn view_index(&self) -> usize {
        match self.current_view {
            View::Analysis => 0,
            View::Form(i) => i + 1,
        }
    }

    pub fn current_form(&self) -> Option<&BoundForm> {
        match self.current_view {
            View::Form(i) => self.forms.get(i),
            View::Analysis => None,
        }
    }

    pub fn current_form_mut(&mut self) -> Option<&mut BoundForm> {
        match self.current_view {
            View::Form(i) => self.forms.get_mut(i),
            View::Analysis => None,
        }
    }

    /// Focus order of the analysis view
    pub fn analysis_targets(&self) -> Vec<AnalysisTarget> {
        let mut targets = vec![AnalysisTarget::FilePath, AnalysisTarget::Lang];
        for section in Section::ALL {
            let count = self.workflow.panel(section).len();
            targets.extend((0..count).map(|i| AnalysisTarget::Input(section, i)));
        }
        targets
    }

    pub fn analysis_target(&self) -> AnalysisTarget {
        let targets = self.analysis_targets();
        targets
            .get(self.analysis_focus)
            .copied()
            .unwrap_or(AnalysisTarget::FilePath)
    }

    /// Move to next form field
    pub fn next_form_field(&mut self) {
        match self.current_view {
            View::Analysis => {
                let count = self.analysis_targets().len();
                self.analysis_focus = (self.analysis_focus + 1) % count;
                self.sync_panel_focus();
            }
            View::Form(_) => {
                if let Some(bound) = self.current_form_mut() {
                    bound.form_mut().next_field();
                }
            }
        }
    }

    /// Move to previous form field
    pub fn prev_form_field(&mut self) {
        match self.current_view {
            View::Analysis => {
                let count = self.analysis_targets().len();
                self.analysis_focus = if self.analysis_focus == 0 {
                    count - 1
                } else {
                    (self.analysis_focus - 1).min(count - 1)
                };
                self.sync_panel_focus();
            }
            View::Form(_) => {
                if let Some(bound) = self.current_form_mut() {
                    bound.form_mut().prev_field();
                }
            }
        }
    }

    fn sync_panel_focus(&mut self) {
        if let AnalysisTarget::Input(section, index) = self.analysis_target() {
            self.workflow.panel_mut(section).set_active(index);
        }
    }

    /// Field that receives typing in the current view
    pub fn focused_field_mut(&mut self) -> Option<&mut FormField> {
        match self.current_view {
            View::Analysis => match self.analysis_target() {
                AnalysisTarget::FilePath => Some(&mut self.workflow.file_path),
                AnalysisTarget::Lang => Some(&mut self.workflow.lang),
                AnalysisTarget::Input(section, index) => {
                    let panel = self.workflow.panel_mut(section);
                    panel.set_active(index);
                    panel.active_input_mut()
                }
            },
            View::Form(_) => self
                .current_form_mut()
                .and_then(|bound| bound.form_mut().active_field_mut()),
        }
    }

    /// Handle character input in form
    pub fn form_input_char(&mut self, c: char) {
        if let Some(field) = self.focused_field_mut() {
            field.push_char(c);
        }
    }

    /// Handle backspace in form
    pub fn form_backspace(&mut self) {
        if let Some(field) = self.focused_field_mut() {
            field.pop_char();
        }
    }

    /// True while any request is in flight
    pub fn is_busy(&self) -> bool {
        self.workflow.is_previewing()
            || self.workflow.is_recalculating()
            || self.forms.iter().any(|b| b.form().control.is_disabled())
    }

    /// Queue an error for the blocking error dialog
    pub fn push_error(&mut self, message: String) {
        self.error_queue.push_back(message);
    }

    pub fn current_error(&self) -> Option<&str> {
        self.error_queue.front().map(String::as_str)
    }

    /// Errors queued behind the one on screen
    pub fn pending_errors(&self) -> usize {
        self.error_queue.len().saturating_sub(1)
    }

    pub fn dismiss_error(&mut self) {
        self.error_queue.pop_front();
    }

    /// Report an analysis failure in the error dialog and the debug panel.
    /// Replaces any in-progress status.
    pub fn show_failure(&mut self, prefix: &str, err: impl Display) {
        tracing::warn!("{prefix}: {err}");
        self.status_message = None;
        self.push_error(format!("{prefix}: {err}"));
        self.debug_text = Some(format!("{prefix}\n\n{err}"));
    }
}
