//! Field references inside a column's `dataField`
//!
//! A data field is either a bare identifier (`travelDistance`) or a
//! template with `{identifier}` placeholders (`{name} {lastname}`).

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::ScopeRecord;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"))
}

/// Classified data field
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldRef {
    /// A single identifier read straight from the record
    Simple(String),
    /// A template; `identifiers` are in first-occurrence order, deduplicated
    Template {
        template: String,
        identifiers: Vec<String>,
    },
}

impl FieldRef {
    pub fn parse(data_field: &str) -> Self {
        let mut identifiers: Vec<String> = Vec::new();
        for caps in placeholder_pattern().captures_iter(data_field) {
            let id = &caps[1];
            if !identifiers.iter().any(|known| known == id) {
                identifiers.push(id.to_string());
            }
        }

        if identifiers.is_empty() {
            FieldRef::Simple(data_field.to_string())
        } else {
            FieldRef::Template {
                template: data_field.to_string(),
                identifiers,
            }
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, FieldRef::Template { .. })
    }

    /// Every identifier the field needs from a record
    pub fn identifiers(&self) -> Vec<&str> {
        match self {
            FieldRef::Simple(id) => vec![id.as_str()],
            FieldRef::Template { identifiers, .. } => {
                identifiers.iter().map(String::as_str).collect()
            }
        }
    }

    /// Fill a template's placeholders from `record`.
    ///
    /// Placeholders whose identifier is absent stay as literal text. For a
    /// simple field this returns the value's text, if any.
    pub fn substitute(&self, record: &ScopeRecord) -> Option<String> {
        match self {
            FieldRef::Simple(id) => record.get(id).map(|v| v.to_string()),
            FieldRef::Template { template, .. } => Some(
                placeholder_pattern()
                    .replace_all(template, |caps: &Captures<'_>| match record.get(&caps[1]) {
                        Some(value) => value.to_string(),
                        None => caps[0].to_string(),
                    })
                    .into_owned(),
            ),
        }
    }
}
