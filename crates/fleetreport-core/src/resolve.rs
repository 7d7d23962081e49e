//! Scope data resolution
//!
//! Columns may reference fields the scope source does not supply
//! intrinsically (`travelDistance`, `driver`, ...). Each scope type
//! registers a batch provider per derived field; the resolver finds the
//! fields a run needs, calls each provider exactly once over the whole
//! dataset and merges the results back onto the records.
//!
//! ## Provider keys
//!
//! Providers are addressed by a key derived from the field name: the
//! first letter is capitalized and wrapped as `get<Field>DataByScopeId`,
//! e.g. `travelDistance` -> `getTravelDistanceDataByScopeId`.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::{ColumnDescriptor, Options, ReportError, Result, ScopeDataSet, ScopeId, Value};

/// Scope id to value mapping produced by one provider call
pub type FieldValues = HashMap<ScopeId, Value>;

/// Batch provider for one derived field
pub type FieldProvider<'a> = Box<dyn Fn(&Options, &ScopeDataSet) -> Result<FieldValues> + 'a>;

/// Lookup key of the provider responsible for `field`
pub fn provider_key(field: &str) -> String {
    let mut chars = field.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("get{capitalized}DataByScopeId")
}

/// Field providers of one scope type, keyed by provider key
#[derive(Default)]
pub struct FieldProviderRegistry<'a> {
    providers: BTreeMap<String, FieldProvider<'a>>,
}

impl<'a> FieldProviderRegistry<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, field: &str, provider: F)
    where
        F: Fn(&Options, &ScopeDataSet) -> Result<FieldValues> + 'a,
    {
        self.providers.insert(provider_key(field), Box::new(provider));
    }

    /// Builder-style registration
    pub fn with<F>(mut self, field: &str, provider: F) -> Self
    where
        F: Fn(&Options, &ScopeDataSet) -> Result<FieldValues> + 'a,
    {
        self.register(field, provider);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldProvider<'a>> {
        self.providers.get(&provider_key(field))
    }

    pub fn supports(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for FieldProviderRegistry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}

/// Outcome of one resolution pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved fields with the number of scopes each one covered,
    /// in resolution order
    pub fields: Vec<(String, usize)>,
    /// Distinct providers invoked
    pub calls: usize,
}

impl Resolution {
    pub fn provider_calls(&self) -> usize {
        self.calls
    }
}

/// Enriches a scope dataset with provider-backed fields
pub struct Resolver<'r, 'a> {
    registry: &'r FieldProviderRegistry<'a>,
    intrinsic: &'r [&'r str],
}

impl<'r, 'a> Resolver<'r, 'a> {
    pub fn new(registry: &'r FieldProviderRegistry<'a>) -> Self {
        Self {
            registry,
            intrinsic: &[],
        }
    }

    /// Fields the scope source supplies itself; never resolved, even when
    /// a record has no value for them
    pub fn with_intrinsic(mut self, fields: &'r [&'r str]) -> Self {
        self.intrinsic = fields;
        self
    }

    /// Fields referenced by `columns` that are neither intrinsic nor on the
    /// representative record.
    ///
    /// Ordered by column declaration, then by position inside a template;
    /// each field appears once.
    pub fn pending_fields(&self, columns: &[ColumnDescriptor], data: &ScopeDataSet) -> Vec<String> {
        let Some(reference) = data.representative() else {
            return Vec::new();
        };

        let mut pending: Vec<String> = Vec::new();
        for column in columns {
            for id in column.field_ref().identifiers() {
                if !reference.contains(id)
                    && !self.intrinsic.iter().any(|f| *f == id)
                    && !pending.iter().any(|p| p == id)
                {
                    pending.push(id.to_string());
                }
            }
        }
        pending
    }

    /// Resolve every pending field of `options.columns` and merge the
    /// values onto `data`.
    ///
    /// Fails with [`ReportError::UnsupportedField`] before calling any
    /// provider when a pending field has none. Fields sharing a provider
    /// key share one call. An empty dataset resolves nothing.
    pub fn resolve(&self, options: &Options, data: &mut ScopeDataSet) -> Result<Resolution> {
        if data.is_empty() {
            debug!("no scopes to enrich, skipping field resolution");
            return Ok(Resolution::default());
        }

        let pending = self.pending_fields(&options.columns, data);
        let mut batches: IndexMap<String, (&FieldProvider<'a>, Vec<&str>)> = IndexMap::new();
        for field in &pending {
            let provider = self
                .registry
                .get(field)
                .ok_or_else(|| ReportError::UnsupportedField(field.clone()))?;
            batches
                .entry(provider_key(field))
                .or_insert_with(|| (provider, Vec::new()))
                .1
                .push(field.as_str());
        }

        let mut resolution = Resolution::default();
        let mut results: Vec<(Vec<&str>, FieldValues)> = Vec::with_capacity(batches.len());
        for (key, (provider, fields)) in batches {
            let values = provider(options, data)?;
            debug!(provider = %key, ?fields, covered = values.len(), scopes = data.len(), "resolved field");
            resolution.calls += 1;
            results.push((fields, values));
        }

        for (fields, values) in results {
            for field in fields {
                let mut covered = 0;
                for (id, value) in &values {
                    if let Some(record) = data.get_mut(*id) {
                        record.set(field, value.clone());
                        covered += 1;
                    }
                }
                resolution.fields.push((field.to_string(), covered));
            }
        }
        Ok(resolution)
    }
}
