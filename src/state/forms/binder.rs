//! Key-value panels: render labeled inputs from JSON and collect them back

use super::FormField;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BinderError {
    #[error("labels '{first}' and '{second}' both map to element id '{element_id}'")]
    DuplicateElementId {
        element_id: String,
        first: String,
        second: String,
    },
}

/// Ordered label → value pairs of one logical form section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    entries: Vec<(String, String)>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, keeping the first insertion position
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(l, v)| (l.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

impl Serialize for FieldSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Element id of the input generated for `label` inside `container_id`
pub fn element_id(container_id: &str, label: &str) -> String {
    let mut normalized = String::with_capacity(label.len());
    let mut in_whitespace = false;
    for c in label.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                normalized.push('_');
            }
            in_whitespace = true;
        } else {
            normalized.push(c);
            in_whitespace = false;
        }
    }
    format!("{container_id}__{normalized}")
}

/// String form of a JSON value as shown in an input
pub fn display_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// A container of labeled text inputs
#[derive(Debug, Clone, Default)]
pub struct KvPanel {
    container_id: String,
    inputs: Vec<FormField>,
    active: usize,
}

impl KvPanel {
    pub fn new(container_id: &str) -> Self {
        Self {
            container_id: container_id.to_string(),
            ..Default::default()
        }
    }

    /// Replace the panel contents with one input per label.
    ///
    /// Labels default to the keys of `values`. On a duplicate element id the
    /// panel is left empty.
    pub fn render(
        &mut self,
        labels: Option<&[String]>,
        values: &Map<String, Value>,
    ) -> Result<(), BinderError> {
        self.inputs.clear();
        self.active = 0;

        let keys: Vec<&str> = match labels {
            Some(labels) => labels.iter().map(String::as_str).collect(),
            None => values.keys().map(String::as_str).collect(),
        };

        let mut seen: HashMap<String, &str> = HashMap::with_capacity(keys.len());
        let mut inputs = Vec::with_capacity(keys.len());
        for label in keys {
            let id = element_id(&self.container_id, label);
            if let Some(first) = seen.get(&id) {
                return Err(BinderError::DuplicateElementId {
                    element_id: id,
                    first: first.to_string(),
                    second: label.to_string(),
                });
            }
            let value = display_string(values.get(label));
            let input = FormField::text_with_value(label, label, value, false)
                .with_element_id(id.clone());
            inputs.push(input);
            seen.insert(id, label);
        }

        self.inputs = inputs;
        Ok(())
    }

    /// Current non-empty values keyed by label, in render order
    pub fn collect(&self) -> FieldSet {
        let mut set = FieldSet::new();
        for input in self.inputs.iter().filter(|i| !i.is_empty()) {
            set.insert(input.label.clone(), input.as_text());
        }
        set
    }

    pub fn inputs(&self) -> &[FormField] {
        &self.inputs
    }

    pub fn input(&self, label: &str) -> Option<&FormField> {
        self.inputs.iter().find(|i| i.label == label)
    }

    pub fn input_mut(&mut self, label: &str) -> Option<&mut FormField> {
        self.inputs.iter_mut().find(|i| i.label == label)
    }

    /// Generated element ids, in render order
    pub fn element_ids(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|i| i.element_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn set_active(&mut self, index: usize) {
        self.active = index.min(self.inputs.len().saturating_sub(1));
    }

    pub fn active_input_mut(&mut self) -> Option<&mut FormField> {
        self.inputs.get_mut(self.active)
    }
}
