//! Column specification parsing
//!
//! Clients declare report columns as a JSON array. Each entry is either a
//! bare field name or an object:
//!
//! ```text
//! [
//!   "domain",
//!   {"dataField": "{name} {lastname}", "width": 40, "label": "Driver"},
//!   {"id": "travelTime", "formatter": "time", "defaultValue": "00:00:00"}
//! ]
//! ```
//!
//! `id` is accepted as an alias of `dataField`. Whether the referenced
//! fields exist is not checked here; the resolver reports unsupported
//! fields with their exact name.

use serde::Deserialize;

use crate::fields::FieldRef;
use crate::{ReportError, Result, Value};

/// One declared report column
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDescriptor {
    /// Field identifier or `{a} {b}` style template
    pub data_field: String,
    /// Column width in character units
    pub width: Option<f64>,
    /// Explicit header label
    pub label: Option<String>,
    /// Registered formatter name
    pub formatter: Option<String>,
    /// Cell value when a simple field is absent on a record
    pub default_value: Option<Value>,
}

impl ColumnDescriptor {
    pub fn new(data_field: impl Into<String>) -> Self {
        Self {
            data_field: data_field.into(),
            width: None,
            label: None,
            formatter: None,
            default_value: None,
        }
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = Some(formatter.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Classify the data field as simple or templated
    pub fn field_ref(&self) -> FieldRef {
        FieldRef::parse(&self.data_field)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeclaredColumn {
    data_field: Option<String>,
    id: Option<String>,
    width: Option<f64>,
    label: Option<String>,
    formatter: Option<String>,
    default_value: Option<Value>,
}

/// Parse a JSON column list into descriptors, preserving declaration order
pub fn parse_columns(json: &str) -> Result<Vec<ColumnDescriptor>> {
    let raw: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| ReportError::Configuration(format!("Parameter 'columns' is not valid JSON: {e}")))?;

    let serde_json::Value::Array(entries) = raw else {
        return Err(ReportError::Configuration(
            "Parameter 'columns' must be a JSON array".into(),
        ));
    };
    if entries.is_empty() {
        return Err(ReportError::Configuration(
            "Parameter 'columns' must declare at least one column".into(),
        ));
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_entry(index, entry))
        .collect()
}

fn parse_entry(index: usize, entry: serde_json::Value) -> Result<ColumnDescriptor> {
    match entry {
        serde_json::Value::String(field) if !field.trim().is_empty() => {
            Ok(ColumnDescriptor::new(field.trim()))
        }
        serde_json::Value::Object(_) => {
            let declared: DeclaredColumn = serde_json::from_value(entry).map_err(|e| {
                ReportError::Configuration(format!("Column {index} is malformed: {e}"))
            })?;
            let data_field = declared
                .data_field
                .or(declared.id)
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .ok_or_else(|| {
                    ReportError::Configuration(format!(
                        "Column {index} declares neither 'dataField' nor 'id'"
                    ))
                })?;

            Ok(ColumnDescriptor {
                data_field,
                width: declared.width.filter(|w| *w > 0.0),
                label: declared.label.filter(|l| !l.is_empty()),
                formatter: declared.formatter.filter(|f| !f.is_empty()),
                default_value: declared.default_value,
            })
        }
        other => Err(ReportError::Configuration(format!(
            "Column {index} must be a field name or an object, got {other}"
        ))),
    }
}
