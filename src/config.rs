//! Configuration handling for the TUI

use anyhow::{bail, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the backend origin
pub const ORIGIN_ENV_VAR: &str = "AIRM_BACKEND_ORIGIN";
const LOG_FILE_NAME: &str = "airm-tui.log";

/// Default backend origin
const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8000";

/// User-visible texts of the submit flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiLabels {
    /// Submit control label while a request is in flight
    pub busy: String,
    /// Submit control label when the form carries no `data_label`
    pub submit: String,
    /// Shown when the backend accepts without a message
    pub success: String,
    /// Shown when a failure carries no usable message
    pub failure: String,
    /// Shown when the backend rejects without a message
    pub unknown_error: String,
}

impl Default for UiLabels {
    fn default() -> Self {
        Self {
            busy: "Sending...".to_string(),
            submit: "Send".to_string(),
            success: "Sent successfully.".to_string(),
            failure: "Something went wrong. Please try again later.".to_string(),
            unknown_error: "Unknown error".to_string(),
        }
    }
}

/// A single text input of a submit form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Key in the submitted JSON object
    pub name: String,
    /// Label shown next to the input
    pub label: String,
    #[serde(default)]
    pub multiline: bool,
}

impl FieldDefinition {
    fn new(name: &str, label: &str, multiline: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            multiline,
        }
    }
}

/// A form that can be bound to an endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormDefinition {
    pub id: String,
    pub title: String,
    pub fields: Vec<FieldDefinition>,
    /// Label restored on the submit control after each submission
    #[serde(default)]
    pub data_label: Option<String>,
}

/// Pairs a form id with the endpoint it submits to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormBinding {
    pub form: String,
    pub endpoint: String,
}

impl FormBinding {
    fn new(form: &str, endpoint: &str) -> Self {
        Self {
            form: form.to_string(),
            endpoint: endpoint.to_string(),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base origin every relative endpoint is resolved against
    pub backend_origin: String,
    pub preview_endpoint: String,
    pub recalc_endpoint: String,
    pub health_endpoint: String,
    /// Sector sent with preview/recalc requests
    pub sector: String,
    /// Initial report language
    pub lang: String,
    /// Request timeout; none means wait indefinitely
    pub request_timeout_secs: Option<u64>,
    pub labels: UiLabels,
    pub forms: Vec<FormDefinition>,
    pub bindings: Vec<FormBinding>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_origin: DEFAULT_ORIGIN.to_string(),
            preview_endpoint: "/airm/preview".to_string(),
            recalc_endpoint: "/airm/recalc".to_string(),
            health_endpoint: "/healthz".to_string(),
            sector: "default".to_string(),
            lang: "hu".to_string(),
            request_timeout_secs: None,
            labels: UiLabels::default(),
            forms: vec![
                FormDefinition {
                    id: "register".to_string(),
                    title: "Register".to_string(),
                    fields: vec![
                        FieldDefinition::new("name", "Name", false),
                        FieldDefinition::new("email", "Email", false),
                        FieldDefinition::new("company", "Company", false),
                        FieldDefinition::new("phone", "Phone", false),
                    ],
                    data_label: Some("Register".to_string()),
                },
                FormDefinition {
                    id: "contact".to_string(),
                    title: "Contact".to_string(),
                    fields: vec![
                        FieldDefinition::new("name", "Name", false),
                        FieldDefinition::new("email", "Email", false),
                        FieldDefinition::new("message", "Message", true),
                    ],
                    data_label: None,
                },
            ],
            bindings: vec![
                FormBinding::new("register", "/api/register"),
                FormBinding::new("contact", "/api/contact"),
            ],
        }
    }
}

impl ClientConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "airm", "airm-tui")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Log file in the platform data dir
    pub fn log_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "airm", "airm-tui").map(|dirs| dirs.data_dir().join(LOG_FILE_NAME))
    }

    /// Load configuration from the platform config dir and the environment
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_origin_override(std::env::var(ORIGIN_ENV_VAR).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Replace the origin when an override is present and non-blank
    pub fn apply_origin_override(&mut self, origin: Option<String>) {
        if let Some(origin) = origin.filter(|o| !o.trim().is_empty()) {
            self.backend_origin = origin.trim().to_string();
        }
    }

    /// Reject form definitions that would collide when serialized
    pub fn validate(&self) -> Result<()> {
        let mut form_ids = HashSet::new();
        for form in &self.forms {
            if !form_ids.insert(form.id.as_str()) {
                bail!("Duplicate form id in configuration: {}", form.id);
            }
            let mut names = HashSet::new();
            for field in &form.fields {
                if !names.insert(field.name.as_str()) {
                    bail!("Duplicate field '{}' in form '{}'", field.name, form.id);
                }
            }
        }
        Ok(())
    }

    /// Find a form definition by id
    pub fn form(&self, id: &str) -> Option<&FormDefinition> {
        self.forms.iter().find(|f| f.id == id)
    }
}
