//! Generic async form submission
//!
//! A [`BoundForm`] pairs a form with the endpoint it posts to. Submitting is
//! split in three steps so the request can run off the UI loop:
//!
//! 1. [`BoundForm::begin`] serializes the fields and marks the form busy,
//! 2. [`Submission::send`] performs the request,
//! 3. [`BoundForm::complete`] reflects the outcome into the status line.
//!
//! The busy mark is a [`BusyToken`] owned by the submission. `send` hands it
//! back with the result and `complete` consumes it, so the control stays
//! disabled until the outcome is shown. A submission that panics or is
//! dropped mid-flight releases it as well.

use super::binder::display_string;
use super::FormField;
use crate::backend::{BackendError, BackendTransport};
use crate::config::{FormDefinition, UiLabels};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "request in flight" flag
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag unless it is already set
    pub fn try_acquire(&self) -> Option<BusyToken> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyToken {
                flag: Arc::clone(&self.0),
            })
    }
}

/// Clears its [`BusyFlag`] when dropped
#[derive(Debug)]
pub struct BusyToken {
    flag: Arc<AtomicBool>,
}

impl Drop for BusyToken {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The submit button of a form
#[derive(Debug, Clone)]
pub struct SubmitControl {
    data_label: Option<String>,
    default_label: String,
    busy_label: String,
    busy: BusyFlag,
}

impl SubmitControl {
    pub fn new(data_label: Option<String>, labels: &UiLabels) -> Self {
        Self {
            data_label,
            default_label: labels.submit.clone(),
            busy_label: labels.busy.clone(),
            busy: BusyFlag::default(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.busy.is_set()
    }

    /// Visible label: the busy indicator while in flight, else the restore label
    pub fn label(&self) -> &str {
        if self.is_disabled() {
            &self.busy_label
        } else {
            self.restore_label()
        }
    }

    fn restore_label(&self) -> &str {
        self.data_label.as_deref().unwrap_or(&self.default_label)
    }
}

/// Style class of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusClass {
    #[default]
    Muted,
    Success,
    Failure,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub class: StatusClass,
}

/// Lifecycle of one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

/// Outcome derived from a backend reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Succeeded { message: String },
    Failed { message: String },
}

impl SubmissionResult {
    /// Classify a reply: a truthy `ok` field is success, everything else fails
    pub fn from_reply(reply: Result<Value, BackendError>, labels: &UiLabels) -> Self {
        match reply {
            Ok(body) if body.get("ok").is_some_and(is_truthy) => SubmissionResult::Succeeded {
                message: reply_message(&body).unwrap_or_else(|| labels.success.clone()),
            },
            Ok(body) => SubmissionResult::Failed {
                message: reply_message(&body).unwrap_or_else(|| labels.unknown_error.clone()),
            },
            Err(err) => {
                let text = err.to_string();
                let message = if text.trim().is_empty() {
                    labels.failure.clone()
                } else {
                    text
                };
                SubmissionResult::Failed { message }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionResult::Succeeded { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            SubmissionResult::Succeeded { message } | SubmissionResult::Failed { message } => {
                message
            }
        }
    }
}

/// JavaScript-style truthiness of a JSON value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn reply_message(body: &Value) -> Option<String> {
    body.get("message")
        .filter(|m| is_truthy(m))
        .map(|m| display_string(Some(m)))
}

/// A form with its fields, submit control and status line
#[derive(Debug, Clone)]
pub struct SubmitForm {
    pub id: String,
    pub title: String,
    pub fields: Vec<FormField>,
    pub control: SubmitControl,
    pub status: StatusLine,
    active: usize,
    last_outcome: Option<SubmissionPhase>,
}

impl SubmitForm {
    pub fn from_definition(definition: &FormDefinition, labels: &UiLabels) -> Self {
        Self {
            id: definition.id.clone(),
            title: definition.title.clone(),
            fields: definition
                .fields
                .iter()
                .map(|f| FormField::text(&f.name, &f.label, f.multiline))
                .collect(),
            control: SubmitControl::new(definition.data_label.clone(), labels),
            status: StatusLine::default(),
            active: 0,
            last_outcome: None,
        }
    }

    /// Every field as a flat string-keyed JSON object, empty values included
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), Value::String(f.as_text().to_string())))
            .collect();
        Value::Object(map)
    }

    /// Clear every field
    pub fn reset(&mut self) {
        for field in &mut self.fields {
            field.clear();
        }
        self.active = 0;
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
    }

    pub fn prev_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = if self.active == 0 {
                self.fields.len() - 1
            } else {
                self.active - 1
            };
        }
    }

    pub fn active_field_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.active)
    }

    pub fn phase(&self) -> SubmissionPhase {
        if self.control.is_disabled() {
            SubmissionPhase::Submitting
        } else {
            self.last_outcome.unwrap_or_default()
        }
    }
}

/// Binds forms to endpoints
pub struct FormSubmitter;

impl FormSubmitter {
    /// Attach a form to an endpoint. An absent form binds nothing.
    pub fn bind(form: Option<SubmitForm>, endpoint: &str, labels: &UiLabels) -> Option<BoundForm> {
        let form = form?;
        tracing::debug!("Bound form '{}' to {}", form.id, endpoint);
        Some(BoundForm {
            form,
            endpoint: endpoint.to_string(),
            labels: labels.clone(),
        })
    }
}

/// A form attached to the endpoint it submits to
#[derive(Debug, Clone)]
pub struct BoundForm {
    form: SubmitForm,
    endpoint: String,
    labels: UiLabels,
}

impl BoundForm {
    pub fn form(&self) -> &SubmitForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut SubmitForm {
        &mut self.form
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Start a submission, or `None` while another one is still in flight
    pub fn begin(&mut self) -> Option<Submission> {
        let Some(token) = self.form.control.busy.try_acquire() else {
            tracing::debug!(
                "Ignoring submit of '{}': a submission is already in flight",
                self.form.id
            );
            return None;
        };

        self.form.status = StatusLine::default();

        Some(Submission {
            form_id: self.form.id.clone(),
            endpoint: self.endpoint.clone(),
            payload: self.form.to_json(),
            labels: self.labels.clone(),
            token,
        })
    }

    /// Reflect an outcome into the status line, then release the control.
    /// Success also resets the fields.
    pub fn complete(&mut self, result: &SubmissionResult, token: BusyToken) {
        match result {
            SubmissionResult::Succeeded { message } => {
                tracing::debug!("Form '{}' submitted", self.form.id);
                self.form.status = StatusLine {
                    text: message.clone(),
                    class: StatusClass::Success,
                };
                self.form.reset();
                self.form.last_outcome = Some(SubmissionPhase::Succeeded);
            }
            SubmissionResult::Failed { message } => {
                tracing::warn!("Form '{}' submission failed: {}", self.form.id, message);
                self.form.status = StatusLine {
                    text: message.clone(),
                    class: StatusClass::Failure,
                };
                self.form.last_outcome = Some(SubmissionPhase::Failed);
            }
        }
        drop(token);
    }

    /// Run a whole submission inline
    #[cfg(test)]
    pub async fn submit(&mut self, transport: &dyn BackendTransport) -> Option<SubmissionResult> {
        let submission = self.begin()?;
        let (result, token) = submission.send(transport).await;
        self.complete(&result, token);
        Some(result)
    }
}

/// An in-flight submission; holds the form's busy token
#[derive(Debug)]
pub struct Submission {
    form_id: String,
    endpoint: String,
    payload: Value,
    labels: UiLabels,
    token: BusyToken,
}

impl Submission {
    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// POST the payload and classify the reply. The busy token comes back
    /// with the result for [`BoundForm::complete`].
    pub async fn send(self, transport: &dyn BackendTransport) -> (SubmissionResult, BusyToken) {
        let reply = transport.post_json(&self.endpoint, &self.payload).await;
        (SubmissionResult::from_reply(reply, &self.labels), self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackendTransport;
    use crate::config::ClientConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn contact_form() -> BoundForm {
        let config = ClientConfig::default();
        let form = SubmitForm::from_definition(config.form("contact").unwrap(), &config.labels);
        FormSubmitter::bind(Some(form), "/api/contact", &config.labels).unwrap()
    }

    fn fill(bound: &mut BoundForm) {
        let form = bound.form_mut();
        form.field_mut("name").unwrap().set_text("Ada".to_string());
        form.field_mut("email").unwrap().set_text("ada@example.com".to_string());
        form.field_mut("message").unwrap().set_text("Hello".to_string());
    }

    fn transport_returning(
        reply: fn() -> Result<Value, BackendError>,
    ) -> MockBackendTransport {
        let mut transport = MockBackendTransport::new();
        transport
            .expect_post_json()
            .times(1)
            .returning(move |_, _| reply());
        transport
    }

    #[test]
    fn test_bind_absent_form_is_noop() {
        let labels = UiLabels::default();
        assert!(FormSubmitter::bind(None, "/api/register", &labels).is_none());
    }

    #[test]
    fn test_payload_includes_every_field() {
        let mut bound = contact_form();
        bound.form_mut().field_mut("name").unwrap().set_text("Ada".to_string());

        assert_eq!(
            bound.form().to_json(),
            json!({"name": "Ada", "email": "", "message": ""})
        );
    }

    #[tokio::test]
    async fn test_success_resets_form_and_shows_message() {
        let mut bound = contact_form();
        fill(&mut bound);

        let mut transport = MockBackendTransport::new();
        transport
            .expect_post_json()
            .withf(|endpoint, body| endpoint == "/api/contact" && body["name"] == "Ada")
            .times(1)
            .returning(|_, _| Ok(json!({"ok": true, "message": "Saved"})));

        let result = bound.submit(&transport).await.unwrap();

        assert!(result.is_success());
        let form = bound.form();
        assert_eq!(form.status.text, "Saved");
        assert_eq!(form.status.class, StatusClass::Success);
        assert!(form.fields.iter().all(|f| f.is_empty()));
        assert_eq!(form.phase(), SubmissionPhase::Succeeded);
    }

    #[tokio::test]
    async fn test_success_without_message_uses_default() {
        let mut bound = contact_form();
        let transport = transport_returning(|| Ok(json!({"ok": 1})));

        bound.submit(&transport).await.unwrap();

        assert_eq!(bound.form().status.text, "Sent successfully.");
        assert_eq!(bound.form().status.class, StatusClass::Success);
    }

    #[tokio::test]
    async fn test_rejection_shows_message_and_keeps_fields() {
        let mut bound = contact_form();
        fill(&mut bound);
        let transport = transport_returning(|| Ok(json!({"ok": false, "message": "Invalid"})));

        let result = bound.submit(&transport).await.unwrap();

        assert_eq!(
            result,
            SubmissionResult::Failed {
                message: "Invalid".to_string()
            }
        );
        let form = bound.form();
        assert_eq!(form.status.text, "Invalid");
        assert_eq!(form.status.class, StatusClass::Failure);
        assert_eq!(form.field("name").unwrap().as_text(), "Ada");
        assert_eq!(form.phase(), SubmissionPhase::Failed);
    }

    #[tokio::test]
    async fn test_rejection_without_message_is_unknown_error() {
        let mut bound = contact_form();
        let transport = transport_returning(|| Ok(json!({"ok": false})));

        bound.submit(&transport).await.unwrap();

        assert_eq!(bound.form().status.text, "Unknown error");
    }

    #[tokio::test]
    async fn test_non_object_reply_is_rejection() {
        let mut bound = contact_form();
        let transport = transport_returning(|| Ok(json!("fine")));

        let result = bound.submit(&transport).await.unwrap();

        assert!(!result.is_success());
        assert_eq!(result.message(), "Unknown error");
    }

    #[tokio::test]
    async fn test_network_error_shows_error_message() {
        let mut bound = contact_form();
        fill(&mut bound);
        let transport =
            transport_returning(|| Err(BackendError::Network("connection refused".to_string())));

        bound.submit(&transport).await.unwrap();

        let form = bound.form();
        assert_eq!(form.status.text, "connection refused");
        assert_eq!(form.status.class, StatusClass::Failure);
        assert_eq!(form.field("email").unwrap().as_text(), "ada@example.com");
    }

    #[tokio::test]
    async fn test_network_error_without_text_uses_fallback() {
        let mut bound = contact_form();
        let transport = transport_returning(|| Err(BackendError::Network(String::new())));

        bound.submit(&transport).await.unwrap();

        assert_eq!(
            bound.form().status.text,
            "Something went wrong. Please try again later."
        );
    }

    #[tokio::test]
    async fn test_control_restored_after_every_outcome() {
        let replies: [fn() -> Result<Value, BackendError>; 3] = [
            || Ok(json!({"ok": true})),
            || Ok(json!({"ok": false, "message": "Invalid"})),
            || Err(BackendError::Network("timeout".to_string())),
        ];

        for reply in replies {
            let mut bound = contact_form();
            let original = bound.form().control.label().to_string();
            let transport = transport_returning(reply);

            bound.submit(&transport).await.unwrap();

            assert!(!bound.form().control.is_disabled());
            assert_eq!(bound.form().control.label(), original);
        }
    }

    #[test]
    fn test_begin_disables_control_and_swaps_label() {
        let mut bound = contact_form();
        bound.form_mut().status = StatusLine {
            text: "old".to_string(),
            class: StatusClass::Failure,
        };

        let submission = bound.begin().unwrap();

        assert!(bound.form().control.is_disabled());
        assert_eq!(bound.form().control.label(), "Sending...");
        assert_eq!(bound.form().status, StatusLine::default());
        assert_eq!(bound.form().phase(), SubmissionPhase::Submitting);
        assert_eq!(submission.form_id(), "contact");

        drop(submission);
        assert!(!bound.form().control.is_disabled());
        assert_eq!(bound.form().control.label(), "Send");
    }

    #[test]
    fn test_second_submit_ignored_while_in_flight() {
        let mut bound = contact_form();

        let first = bound.begin();
        assert!(first.is_some());
        assert!(bound.begin().is_none());

        drop(first);
        assert!(bound.begin().is_some());
    }

    #[test]
    fn test_dropping_unpolled_send_releases_control() {
        let mut bound = contact_form();
        let transport = MockBackendTransport::new();

        let submission = bound.begin().unwrap();
        let pending = submission.send(&transport);
        assert!(bound.form().control.is_disabled());

        drop(pending);
        assert!(!bound.form().control.is_disabled());
    }

    #[test]
    fn test_panic_while_in_flight_releases_control() {
        let mut bound = contact_form();
        let submission = bound.begin().unwrap();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = submission;
            panic!("handler blew up");
        }));

        assert!(outcome.is_err());
        assert!(!bound.form().control.is_disabled());
    }

    #[test]
    fn test_send_via_block_on() {
        let mut bound = contact_form();
        let transport = transport_returning(|| Ok(json!({"ok": "yes", "message": "Thanks"})));

        let submission = bound.begin().unwrap();
        let (result, token) = tokio_test::block_on(submission.send(&transport));
        bound.complete(&result, token);

        assert_eq!(bound.form().status.text, "Thanks");
    }

    #[test]
    fn test_control_stays_disabled_until_complete() {
        let mut bound = contact_form();
        fill(&mut bound);
        let transport = transport_returning(|| Ok(json!({"ok": true, "message": "Saved"})));

        let submission = bound.begin().unwrap();
        let (result, token) = tokio_test::block_on(submission.send(&transport));

        // Reply received but not yet shown
        assert!(bound.form().control.is_disabled());
        assert!(bound.begin().is_none());
        assert_eq!(bound.form().field("name").unwrap().as_text(), "Ada");

        bound.complete(&result, token);

        assert!(!bound.form().control.is_disabled());
        assert_eq!(bound.form().status.text, "Saved");
        assert!(bound.form().field("name").unwrap().is_empty());
    }

    #[test]
    fn test_data_label_restored() {
        let config = ClientConfig::default();
        let form = SubmitForm::from_definition(config.form("register").unwrap(), &config.labels);
        let mut bound = FormSubmitter::bind(Some(form), "/api/register", &config.labels).unwrap();

        assert_eq!(bound.form().control.label(), "Register");
        let submission = bound.begin().unwrap();
        assert_eq!(bound.form().control.label(), "Sending...");
        drop(submission);
        assert_eq!(bound.form().control.label(), "Register");
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!([])));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn test_field_navigation_wraps() {
        let mut bound = contact_form();
        let form = bound.form_mut();
        form.prev_field();
        assert_eq!(form.active_index(), 2);
        form.next_field();
        assert_eq!(form.active_index(), 0);
    }
}
