//! Application state and core logic

use crate::backend::{BackendClient, BackendTransport};
use crate::config::ClientConfig;
use crate::shortcuts;
use crate::state::{
    AnalysisTarget, AppState, BusyToken, PreviewResponse, RecalcReport, SubmissionResult,
    View, WorkflowError,
};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Error dialog prefixes of the analysis flow
const PREVIEW_FAILED: &str = "Preview failed";
const RECALC_FAILED: &str = "Report/decision failed";

/// Results delivered by background requests.
///
/// Request results carry the busy token of their request, so the matching
/// control stays disabled until the result has been applied.
#[derive(Debug)]
pub enum AppEvent {
    Connection(bool),
    Submitted {
        form: usize,
        result: SubmissionResult,
        token: BusyToken,
    },
    Previewed {
        result: Result<PreviewResponse, WorkflowError>,
        token: BusyToken,
    },
    Recalculated {
        result: Result<RecalcReport, WorkflowError>,
        token: BusyToken,
    },
}

/// Main application struct
pub struct App {
    /// Current application state
    pub state: AppState,
    /// Backend transport shared with background requests
    backend: Arc<dyn BackendTransport>,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    /// Whether the app should quit
    quit: bool,
}

impl App {
    /// Create a new App talking to the configured backend
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let backend = BackendClient::new(config)?;
        tracing::debug!("Using backend at {}", backend.origin());
        Ok(Self::with_transport(config, Arc::new(backend)))
    }

    pub fn with_transport(config: &ClientConfig, backend: Arc<dyn BackendTransport>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(config),
            backend,
            events_tx,
            events_rx,
            quit: false,
        }
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Check the backend health endpoint in the background
    pub fn check_connection(&self) {
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let connected = backend.check_connection().await;
            let _ = tx.send(AppEvent::Connection(connected));
        });
    }

    /// Apply every result that has arrived since the last tick
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    /// Wait for the next background result and apply it
    #[cfg(test)]
    pub async fn process_next_event(&mut self) {
        if let Some(event) = self.next_event().await {
            self.handle_event(event);
        }
    }

    /// Wait for the next background result without applying it
    #[cfg(test)]
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.events_rx.recv().await
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Connection(connected) => {
                self.state.backend_connected = connected;
            }
            AppEvent::Submitted {
                form,
                result,
                token,
            } => {
                tracing::debug!(
                    "Submission {} finished: {}",
                    if result.is_success() { "succeeded" } else { "failed" },
                    result.message()
                );
                if let Some(bound) = self.state.forms.get_mut(form) {
                    bound.complete(&result, token);
                }
            }
            AppEvent::Previewed { result, token } => {
                self.apply_preview_result(result);
                drop(token);
            }
            AppEvent::Recalculated { result, token } => {
                match result {
                    Ok(report) => {
                        self.state.status_message =
                            Some(format!("Decision: {}", report.decision_label()));
                        self.state.workflow.apply_report(report);
                    }
                    Err(err) => self.state.show_failure(RECALC_FAILED, err),
                }
                drop(token);
            }
        }
    }

    fn apply_preview_result(&mut self, result: Result<PreviewResponse, WorkflowError>) {
        match result.and_then(|response| self.state.workflow.apply_preview(response)) {
            Ok(()) => {
                self.state.analysis_focus = 0;
                self.state.debug_text = None;
                self.state.status_message = Some("Preview loaded".to_string());
            }
            Err(err) => self.state.show_failure(PREVIEW_FAILED, err),
        }
    }

    /// Handle a key event
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // The error dialog is blocking
        if self.state.current_error().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.state.dismiss_error();
            }
            return Ok(());
        }

        if shortcuts::is_ctrl(&key, 'q') {
            self.quit = true;
            return Ok(());
        }

        if let Some(index) = shortcuts::view_index(&key) {
            self.state.select_view(index);
            return Ok(());
        }

        match self.state.current_view {
            View::Analysis => self.handle_analysis_key(key),
            View::Form(index) => self.handle_form_key(index, key),
        }
        Ok(())
    }

    /// Handle keys in the analysis view
    fn handle_analysis_key(&mut self, key: KeyEvent) {
        if shortcuts::is_ctrl(&key, 'p') {
            self.start_preview();
            return;
        }
        if shortcuts::is_ctrl(&key, 'r') {
            self.start_recalc();
            return;
        }
        if shortcuts::is_ctrl(&key, 'd') {
            self.state.debug_text = None;
            return;
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => self.state.next_form_field(),
            KeyCode::BackTab | KeyCode::Up => self.state.prev_form_field(),
            KeyCode::Enter => match self.state.analysis_target() {
                AnalysisTarget::FilePath | AnalysisTarget::Lang => self.start_preview(),
                AnalysisTarget::Input(..) => self.state.next_form_field(),
            },
            KeyCode::Char(c) => self.state.form_input_char(c),
            KeyCode::Backspace => self.state.form_backspace(),
            _ => {}
        }
    }

    /// Handle keys in a form view
    fn handle_form_key(&mut self, index: usize, key: KeyEvent) {
        if shortcuts::is_ctrl(&key, 's') {
            self.submit_form(index);
            return;
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => self.state.next_form_field(),
            KeyCode::BackTab | KeyCode::Up => self.state.prev_form_field(),
            KeyCode::Enter => {
                let multiline = self
                    .state
                    .current_form()
                    .and_then(|b| b.form().fields.get(b.form().active_index()))
                    .is_some_and(|f| f.is_multiline);
                if multiline {
                    self.state.form_input_char('\n');
                } else {
                    self.submit_form(index);
                }
            }
            KeyCode::Char(c) => self.state.form_input_char(c),
            KeyCode::Backspace => self.state.form_backspace(),
            _ => {}
        }
    }

    /// Send a bound form in the background
    fn submit_form(&mut self, index: usize) {
        let Some(submission) = self.state.forms.get_mut(index).and_then(|b| b.begin()) else {
            return;
        };
        tracing::debug!(
            "Submitting form '{}': {}",
            submission.form_id(),
            submission.payload()
        );

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let (result, token) = submission.send(backend.as_ref()).await;
            let _ = tx.send(AppEvent::Submitted {
                form: index,
                result,
                token,
            });
        });
    }

    /// Upload the chosen PDF in the background
    fn start_preview(&mut self) {
        let request = match self.state.workflow.begin_preview() {
            Ok(Some(request)) => request,
            Ok(None) => return,
            Err(err) => {
                // Nothing was sent yet, so there is nothing to debug
                self.state.push_error(err.to_string());
                return;
            }
        };
        self.state.status_message = Some("Uploading...".to_string());

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let (result, token) = request.send(backend.as_ref()).await;
            let _ = tx.send(AppEvent::Previewed { result, token });
        });
    }

    /// Send the edited panels for recalculation in the background
    fn start_recalc(&mut self) {
        let request = match self.state.workflow.begin_recalc() {
            Ok(Some(request)) => request,
            Ok(None) => return,
            Err(err) => {
                // No snapshot yet
                self.state.push_error(err.to_string());
                return;
            }
        };
        tracing::debug!("Recalc overrides: {}", request.overrides());

        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let (result, token) = request.send(backend.as_ref()).await;
            let _ = tx.send(AppEvent::Recalculated { result, token });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackendTransport};
    use crate::state::{BusyFlag, Section, StatusClass};
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
    }

    fn ctrl(app: &mut App, c: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
            .unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn app_with(transport: MockBackendTransport) -> App {
        App::with_transport(&ClientConfig::default(), Arc::new(transport))
    }

    #[tokio::test]
    async fn test_submit_contact_form_success() {
        let mut transport = MockBackendTransport::new();
        transport
            .expect_post_json()
            .withf(|endpoint, body| {
                endpoint == "/api/contact"
                    && *body == json!({"name": "Ada", "email": "", "message": ""})
            })
            .times(1)
            .returning(|_, _| Ok(json!({"ok": true, "message": "Saved"})));
        let mut app = app_with(transport);

        press(&mut app, KeyCode::F(3));
        type_text(&mut app, "Ada");
        ctrl(&mut app, 's');

        assert!(app.state.forms[1].form().control.is_disabled());
        app.process_next_event().await;

        let form = app.state.forms[1].form();
        assert!(!form.control.is_disabled());
        assert_eq!(form.status.text, "Saved");
        assert_eq!(form.status.class, StatusClass::Success);
        assert!(form.field("name").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_double_submit_sends_once() {
        let mut transport = MockBackendTransport::new();
        transport
            .expect_post_json()
            .times(1)
            .returning(|_, _| Ok(json!({"ok": false, "message": "Invalid"})));
        let mut app = app_with(transport);

        press(&mut app, KeyCode::F(2));
        ctrl(&mut app, 's');
        ctrl(&mut app, 's');
        app.process_next_event().await;

        let form = app.state.forms[0].form();
        assert_eq!(form.status.text, "Invalid");
        assert_eq!(form.status.class, StatusClass::Failure);
        assert_eq!(form.control.label(), "Register");
    }

    #[tokio::test]
    async fn test_submit_ignored_until_reply_is_applied() {
        let mut transport = MockBackendTransport::new();
        transport
            .expect_post_json()
            .times(1)
            .returning(|_, _| Ok(json!({"ok": true, "message": "Welcome"})));
        let mut app = app_with(transport);

        press(&mut app, KeyCode::F(2));
        ctrl(&mut app, 's');

        // The request has finished but its reply is still queued
        let event = app.next_event().await.unwrap();
        assert!(matches!(event, AppEvent::Submitted { form: 0, .. }));
        ctrl(&mut app, 's');
        assert!(app.state.forms[0].form().control.is_disabled());

        app.handle_event(event);

        let form = app.state.forms[0].form();
        assert!(!form.control.is_disabled());
        assert_eq!(form.status.text, "Welcome");
        assert_eq!(form.status.class, StatusClass::Success);
        app.drain_events();
        assert_eq!(app.state.forms[0].form().status.text, "Welcome");
    }

    #[tokio::test]
    async fn test_preview_stays_busy_until_reply_is_applied() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut transport = MockBackendTransport::new();
        transport
            .expect_post_multipart()
            .times(1)
            .returning(|_, _| Ok(json!({"ok": true, "saved_pdf": "x_1.pdf", "bs": {"Cash": 1}})));
        let mut app = app_with(transport);

        type_text(&mut app, &file.path().display().to_string());
        ctrl(&mut app, 'p');
        let event = app.next_event().await.unwrap();
        ctrl(&mut app, 'p');
        assert!(app.state.workflow.is_previewing());

        app.handle_event(event);

        assert!(!app.state.workflow.is_previewing());
        assert_eq!(app.state.workflow.snapshot().unwrap().saved_pdf, "x_1.pdf");
    }

    #[tokio::test]
    async fn test_enter_in_multiline_field_adds_newline() {
        let mut app = app_with(MockBackendTransport::new());

        press(&mut app, KeyCode::F(3));
        press(&mut app, KeyCode::BackTab);
        type_text(&mut app, "a");
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "b");

        let form = app.state.forms[1].form();
        assert_eq!(form.field("message").unwrap().as_text(), "a\nb");
        assert!(!form.control.is_disabled());
    }

    #[tokio::test]
    async fn test_preview_without_file_shows_error() {
        let mut app = app_with(MockBackendTransport::new());

        ctrl(&mut app, 'p');

        assert_eq!(app.state.current_error(), Some("Choose a PDF first!"));
        assert!(app.state.debug_text.is_none());
        assert!(app.state.status_message.is_none());
        // Dialog blocks other keys until dismissed
        type_text(&mut app, "x");
        assert!(app.state.workflow.file_path.is_empty());
        press(&mut app, KeyCode::Enter);
        assert!(app.state.current_error().is_none());
    }

    #[tokio::test]
    async fn test_recalc_without_preview_prompts() {
        let mut app = app_with(MockBackendTransport::new());

        ctrl(&mut app, 'r');

        assert_eq!(app.state.current_error(), Some("Create a preview first."));
        assert!(app.state.debug_text.is_none());
    }

    #[tokio::test]
    async fn test_preview_failure_fills_debug_panel() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut transport = MockBackendTransport::new();
        transport.expect_post_multipart().times(1).returning(|_, _| {
            Err(BackendError::Status {
                status: 400,
                detail: "Please upload a PDF".to_string(),
            })
        });
        let mut app = app_with(transport);

        type_text(&mut app, &file.path().display().to_string());
        press(&mut app, KeyCode::Enter);
        app.process_next_event().await;

        assert_eq!(
            app.state.current_error(),
            Some("Preview failed: HTTP 400: Please upload a PDF")
        );
        assert_eq!(
            app.state.debug_text.as_deref(),
            Some("Preview failed\n\nHTTP 400: Please upload a PDF")
        );
        assert!(app.state.status_message.is_none());
        assert!(!app.state.workflow.is_previewing());
    }

    #[tokio::test]
    async fn test_preview_then_recalc() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut transport = MockBackendTransport::new();
        transport
            .expect_post_multipart()
            .withf(|endpoint, _| endpoint == "/airm/preview")
            .times(1)
            .returning(|_, _| {
                Ok(json!({
                    "ok": true,
                    "saved_pdf": "x_1.pdf",
                    "bs_labels": ["Cash"],
                    "pl_labels": [],
                    "bs": {"Cash": 10}
                }))
            });
        transport
            .expect_post_multipart()
            .withf(|endpoint, body| {
                endpoint == "/airm/recalc" && body.text_value("saved_pdf") == Some("x_1.pdf")
            })
            .times(1)
            .returning(|_, _| Ok(json!({"ok": true, "decision_code": "REJECT", "risk_score": 95})));
        let mut app = app_with(transport);

        type_text(&mut app, &file.path().display().to_string());
        ctrl(&mut app, 'p');
        app.process_next_event().await;

        assert_eq!(app.state.workflow.panel(Section::Bs).len(), 1);
        assert_eq!(app.state.status_message.as_deref(), Some("Preview loaded"));

        ctrl(&mut app, 'r');
        app.process_next_event().await;

        let report = app.state.workflow.report().unwrap();
        assert_eq!(report.decision_label(), "REJECT");
        assert_eq!(report.risk_label(), "Risk: 95");
        assert_eq!(app.state.status_message.as_deref(), Some("Decision: REJECT"));
    }

    #[tokio::test]
    async fn test_connection_event() {
        let mut transport = MockBackendTransport::new();
        transport.expect_check_connection().times(1).returning(|| true);
        let mut app = app_with(transport);

        app.check_connection();
        app.process_next_event().await;

        assert!(app.state.backend_connected);
    }

    #[tokio::test]
    async fn test_ctrl_q_quits() {
        let mut app = app_with(MockBackendTransport::new());
        assert!(!app.should_quit());
        ctrl(&mut app, 'q');
        assert!(app.should_quit());
    }

    #[tokio::test]
    async fn test_drain_events_applies_pending_results() {
        let mut app = app_with(MockBackendTransport::new());
        let flag = BusyFlag::default();
        app.events_tx.send(AppEvent::Connection(true)).unwrap();
        app.events_tx
            .send(AppEvent::Submitted {
                form: 0,
                result: SubmissionResult::Failed {
                    message: "Invalid".to_string(),
                },
                token: flag.try_acquire().unwrap(),
            })
            .unwrap();

        app.drain_events();

        assert!(app.state.backend_connected);
        assert_eq!(app.state.forms[0].form().status.text, "Invalid");
        assert!(!flag.is_set());
    }
}
