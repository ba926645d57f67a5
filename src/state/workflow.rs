//! Preview/recalc analysis workflow
//!
//! A preview uploads a PDF and answers with four field sets plus a reference
//! to the stored upload. That answer becomes the workflow's snapshot; a recalc
//! sends the reference back unchanged together with whatever the user edited
//! in the four panels.

use super::forms::{BinderError, BusyFlag, BusyToken, FieldSet, FormField, KvPanel};
use crate::backend::{BackendError, BackendTransport, MultipartBody};
use crate::config::ClientConfig;
use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Choose a PDF first!")]
    NoFile,

    #[error("Create a preview first.")]
    NoPreview,

    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Binder(#[from] BinderError),
}

/// The four report sections, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    BsPrev,
    Bs,
    PlPrev,
    Pl,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::BsPrev, Section::Bs, Section::PlPrev, Section::Pl];

    /// Container id and overrides key
    pub fn key(self) -> &'static str {
        match self {
            Section::BsPrev => "bs_prev",
            Section::Bs => "bs",
            Section::PlPrev => "pl_prev",
            Section::Pl => "pl",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::BsPrev => "Balance sheet (previous)",
            Section::Bs => "Balance sheet (current)",
            Section::PlPrev => "P&L (previous)",
            Section::Pl => "P&L (current)",
        }
    }

    fn index(self) -> usize {
        match self {
            Section::BsPrev => 0,
            Section::Bs => 1,
            Section::PlPrev => 2,
            Section::Pl => 3,
        }
    }
}

/// Reply of the preview endpoint
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PreviewResponse {
    pub saved_pdf: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub bs_labels: Option<Vec<String>>,
    #[serde(default)]
    pub pl_labels: Option<Vec<String>>,
    #[serde(default)]
    pub bs: Map<String, Value>,
    #[serde(default)]
    pub bs_prev: Map<String, Value>,
    #[serde(default)]
    pub pl: Map<String, Value>,
    #[serde(default)]
    pub pl_prev: Map<String, Value>,
}

impl PreviewResponse {
    fn values(&self, section: Section) -> &Map<String, Value> {
        match section {
            Section::BsPrev => &self.bs_prev,
            Section::Bs => &self.bs,
            Section::PlPrev => &self.pl_prev,
            Section::Pl => &self.pl,
        }
    }

    /// Label list for a section; empty lists count as missing
    fn labels(&self, section: Section) -> Option<&[String]> {
        let labels = match section {
            Section::BsPrev | Section::Bs => &self.bs_labels,
            Section::PlPrev | Section::Pl => &self.pl_labels,
        };
        labels.as_deref().filter(|l| !l.is_empty())
    }
}

/// State returned by the last preview, threaded into the next recalc
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSnapshot {
    pub saved_pdf: String,
    pub sector: String,
    pub lang: String,
    pub response: PreviewResponse,
    pub received_at: DateTime<Local>,
}

/// Reply of the recalc endpoint
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RecalcReport {
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub decision_code: Option<String>,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub equity_value: Option<f64>,
    #[serde(default)]
    pub docx_file: Option<String>,
    /// The whole reply, pretty-printed
    #[serde(skip)]
    pub raw_json: String,
}

impl RecalcReport {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let raw_json = serde_json::to_string_pretty(&value)?;
        let mut report: RecalcReport = serde_json::from_value(value)?;
        report.raw_json = raw_json;
        Ok(report)
    }

    pub fn decision_label(&self) -> &str {
        self.decision_code
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or("UNKNOWN")
    }

    pub fn risk_label(&self) -> String {
        format!("Risk: {}", number_or_na(self.risk_score))
    }

    pub fn equity_label(&self) -> String {
        format!("Equity: {}", number_or_na(self.equity_value))
    }
}

fn number_or_na(value: Option<f64>) -> String {
    value.map_or_else(|| "n.a.".to_string(), |v| v.to_string())
}

/// An in-flight preview upload
#[derive(Debug)]
pub struct PreviewRequest {
    path: PathBuf,
    sector: String,
    lang: String,
    endpoint: String,
    token: BusyToken,
}

impl PreviewRequest {
    /// Upload the file. The busy token comes back with the result and is
    /// held until the reply has been applied.
    pub async fn send(
        self,
        transport: &dyn BackendTransport,
    ) -> (Result<PreviewResponse, WorkflowError>, BusyToken) {
        let result = self.upload(transport).await;
        (result, self.token)
    }

    async fn upload(
        &self,
        transport: &dyn BackendTransport,
    ) -> Result<PreviewResponse, WorkflowError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| WorkflowError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.pdf".to_string());

        let body = MultipartBody::new()
            .file("file", &file_name, "application/pdf", bytes)
            .text("sector", self.sector.clone())
            .text("lang", self.lang.clone());

        let reply = transport.post_multipart(&self.endpoint, body).await?;
        Ok(serde_json::from_value(reply)?)
    }
}

/// An in-flight recalculation
#[derive(Debug)]
pub struct RecalcRequest {
    saved_pdf: String,
    sector: String,
    lang: String,
    overrides: Value,
    endpoint: String,
    token: BusyToken,
}

impl RecalcRequest {
    pub fn overrides(&self) -> &Value {
        &self.overrides
    }

    pub async fn send(
        self,
        transport: &dyn BackendTransport,
    ) -> (Result<RecalcReport, WorkflowError>, BusyToken) {
        let result = self.recalc(transport).await;
        (result, self.token)
    }

    async fn recalc(&self, transport: &dyn BackendTransport) -> Result<RecalcReport, WorkflowError> {
        let body = MultipartBody::new()
            .text("saved_pdf", self.saved_pdf.clone())
            .text("sector", self.sector.clone())
            .text("lang", self.lang.clone())
            .text("overrides_json", self.overrides.to_string());

        let reply = transport.post_multipart(&self.endpoint, body).await?;
        Ok(RecalcReport::from_value(reply)?)
    }
}

/// Preview → edit → recalc state of one analysis session
#[derive(Debug)]
pub struct AnalysisWorkflow {
    pub file_path: FormField,
    pub lang: FormField,
    default_lang: String,
    sector: String,
    preview_endpoint: String,
    recalc_endpoint: String,
    panels: [KvPanel; 4],
    snapshot: Option<PreviewSnapshot>,
    report: Option<RecalcReport>,
    previewing: BusyFlag,
    recalculating: BusyFlag,
}

impl AnalysisWorkflow {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            file_path: FormField::text("pdf", "PDF file", false),
            lang: FormField::text_with_value("lang", "Language", config.lang.clone(), false),
            default_lang: config.lang.clone(),
            sector: config.sector.clone(),
            preview_endpoint: config.preview_endpoint.clone(),
            recalc_endpoint: config.recalc_endpoint.clone(),
            panels: Section::ALL.map(|s| KvPanel::new(s.key())),
            snapshot: None,
            report: None,
            previewing: BusyFlag::default(),
            recalculating: BusyFlag::default(),
        }
    }

    pub fn panel(&self, section: Section) -> &KvPanel {
        &self.panels[section.index()]
    }

    pub fn panel_mut(&mut self, section: Section) -> &mut KvPanel {
        &mut self.panels[section.index()]
    }

    pub fn snapshot(&self) -> Option<&PreviewSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn report(&self) -> Option<&RecalcReport> {
        self.report.as_ref()
    }

    pub fn is_previewing(&self) -> bool {
        self.previewing.is_set()
    }

    pub fn is_recalculating(&self) -> bool {
        self.recalculating.is_set()
    }

    fn current_lang(&self) -> String {
        let lang = self.lang.as_text().trim();
        if lang.is_empty() {
            self.default_lang.clone()
        } else {
            lang.to_string()
        }
    }

    /// Prepare a preview upload; `Ok(None)` while one is already running
    pub fn begin_preview(&self) -> Result<Option<PreviewRequest>, WorkflowError> {
        let path = self.file_path.as_text().trim();
        if path.is_empty() {
            return Err(WorkflowError::NoFile);
        }
        let Some(token) = self.previewing.try_acquire() else {
            return Ok(None);
        };

        Ok(Some(PreviewRequest {
            path: PathBuf::from(path),
            sector: self.sector.clone(),
            lang: self.current_lang(),
            endpoint: self.preview_endpoint.clone(),
            token,
        }))
    }

    /// Replace the snapshot and re-render all panels from a preview reply.
    ///
    /// Nothing changes if any panel fails to render.
    pub fn apply_preview(&mut self, response: PreviewResponse) -> Result<(), WorkflowError> {
        let mut panels = Section::ALL.map(|s| KvPanel::new(s.key()));
        for section in Section::ALL {
            let panel = &mut panels[section.index()];
            panel.render(response.labels(section), response.values(section))?;
            tracing::debug!(
                "Rendered {}: {}",
                section.key(),
                panel.element_ids().collect::<Vec<_>>().join(", ")
            );
        }

        tracing::debug!("Preview loaded for {}", response.saved_pdf);
        self.panels = panels;
        self.snapshot = Some(PreviewSnapshot {
            saved_pdf: response.saved_pdf.clone(),
            sector: response.sector.clone().unwrap_or_else(|| self.sector.clone()),
            lang: response.lang.clone().unwrap_or_else(|| self.current_lang()),
            response,
            received_at: Local::now(),
        });
        self.report = None;
        Ok(())
    }

    /// Edited panel values keyed by section
    pub fn overrides(&self) -> Value {
        let mut overrides = Map::new();
        for section in Section::ALL {
            let set: FieldSet = self.panel(section).collect();
            tracing::debug!("{} values overridden in {}", set.len(), section.key());
            overrides.insert(section.key().to_string(), set.to_json());
        }
        Value::Object(overrides)
    }

    /// Prepare a recalculation; `Ok(None)` while one is already running
    pub fn begin_recalc(&self) -> Result<Option<RecalcRequest>, WorkflowError> {
        let snapshot = self.snapshot.as_ref().ok_or(WorkflowError::NoPreview)?;
        let Some(token) = self.recalculating.try_acquire() else {
            return Ok(None);
        };

        Ok(Some(RecalcRequest {
            saved_pdf: snapshot.saved_pdf.clone(),
            sector: snapshot.sector.clone(),
            lang: self.current_lang(),
            overrides: self.overrides(),
            endpoint: self.recalc_endpoint.clone(),
            token,
        }))
    }

    pub fn apply_report(&mut self, report: RecalcReport) {
        tracing::debug!("Recalc finished: {}", report.decision_label());
        self.report = Some(report);
    }
}
