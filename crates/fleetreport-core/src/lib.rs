//! # fleetreport-core
//!
//! Report assembly engine for periodic fleet performance reports.
//!
//! This crate provides:
//! - Domain types: `Value`, `ScopeRecord`, `ScopeDataSet`, `Options`, `Period`
//! - Column specification parsing (`columns`) and field templates (`fields`)
//! - Batch field resolution against per-scope provider registries (`resolve`)
//! - Value formatters (`format`) and the in-memory sheet layout (`sheet`)
//! - The report pipeline wiring everything to its collaborators (`pipeline`)
//! - Collaborator traits: `ScopeSource`, `SheetWriter`, `Mailer`, `TimezoneDirectory`
//!
//! ## Example
//!
//! ```rust
//! use fleetreport_core::{ScopeDataSet, ScopeRecord, Value};
//!
//! let mut data = ScopeDataSet::new();
//! data.insert(1, ScopeRecord::new().with("domain", "AB123CD"));
//! data.insert(2, ScopeRecord::new().with("domain", "EF456GH"));
//!
//! assert_eq!(data.len(), 2);
//! assert_eq!(data.get(1).and_then(|r| r.get("domain")), Some(&Value::from("AB123CD")));
//! ```

pub mod columns;
pub mod fields;
pub mod format;
pub mod i18n;
pub mod options;
pub mod pipeline;
pub mod resolve;
pub mod sheet;

#[cfg(test)]
pub(crate) mod test_support;

pub use columns::{parse_columns, ColumnDescriptor};
pub use fields::FieldRef;
pub use format::FormatterRegistry;
pub use i18n::Messages;
pub use options::RawOptions;
pub use pipeline::{Attachment, OutgoingMail, PreparedReport, ReportPipeline, ReportSummary};
pub use resolve::{provider_key, FieldProviderRegistry, FieldValues, Resolution, Resolver};
pub use sheet::{SheetGrid, SheetRenderer};

use chrono::{DateTime, Duration, FixedOffset, Months, NaiveTime, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Type Aliases
// ============================================================================

/// Unique identifier of one scope entity (holder id or contact id)
pub type ScopeId = u64;

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Values and Records
// ============================================================================

/// A scalar cell value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, parsing text when it holds a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Decimal(d) => Some(*d),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Decimal(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Decimal(d)
    }
}

/// Field name to value mapping for one scope entity
///
/// Populated by the scope source with intrinsic fields, then enriched in
/// place by the resolver. Fields are only ever added or overwritten.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeRecord {
    fields: BTreeMap<String, Value>,
}

impl ScopeRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Ordered scope id to record mapping for one report run
///
/// Iteration order is the order in which the scope source inserted the
/// records; rows are rendered in that order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScopeDataSet {
    records: IndexMap<ScopeId, ScopeRecord>,
}

impl ScopeDataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ScopeId, record: ScopeRecord) {
        self.records.insert(id, record);
    }

    pub fn get(&self, id: ScopeId) -> Option<&ScopeRecord> {
        self.records.get(&id)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut ScopeRecord> {
        self.records.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The record presence checks are made against
    pub fn representative(&self) -> Option<&ScopeRecord> {
        self.records.first().map(|(_, record)| record)
    }

    pub fn ids(&self) -> Vec<ScopeId> {
        self.records.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &ScopeRecord)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }
}

impl FromIterator<(ScopeId, ScopeRecord)> for ScopeDataSet {
    fn from_iter<I: IntoIterator<Item = (ScopeId, ScopeRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Run Configuration
// ============================================================================

/// Entity type a report row represents
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Holder,
    Contact,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Holder => "holder",
            ScopeKind::Contact => "contact",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "holder" => Ok(ScopeKind::Holder),
            "contact" => Ok(ScopeKind::Contact),
            other => Err(ReportError::Configuration(format!(
                "Parameter 'scope' must be 'holder' or 'contact', got '{other}'"
            ))),
        }
    }
}

/// How far back a report reaches
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl FromStr for Frequency {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(ReportError::Configuration(format!(
                "Parameter 'frequency' must be 'weekly' or 'monthly', got '{other}'"
            ))),
        }
    }
}

/// Report period boundaries in the run's time zone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
}

impl Period {
    /// Period ending today (23:59:59 local) and starting at midnight one
    /// week or one calendar month earlier.
    ///
    /// Month subtraction clamps to the last day of the shorter month
    /// (March 31 -> February 28).
    pub fn ending_at(now: DateTime<Utc>, timezone: FixedOffset, frequency: Frequency) -> Result<Self> {
        let today = now.with_timezone(&timezone).date_naive();
        let first_day = match frequency {
            Frequency::Weekly => today.checked_sub_signed(Duration::days(7)),
            Frequency::Monthly => today.checked_sub_months(Months::new(1)),
        }
        .ok_or_else(|| ReportError::Configuration("Report period is out of range".into()))?;

        let (Some(midnight), Some(end_of_day)) =
            (NaiveTime::from_hms_opt(0, 0, 0), NaiveTime::from_hms_opt(23, 59, 59))
        else {
            return Err(ReportError::Configuration("Invalid day boundaries".into()));
        };

        let from = timezone
            .from_local_datetime(&first_day.and_time(midnight))
            .single();
        let to = timezone.from_local_datetime(&today.and_time(end_of_day)).single();

        match (from, to) {
            (Some(from), Some(to)) => Ok(Self { from, to }),
            _ => Err(ReportError::Configuration("Report period is out of range".into())),
        }
    }

    pub fn from_utc(&self) -> DateTime<Utc> {
        self.from.with_timezone(&Utc)
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.to.with_timezone(&Utc)
    }

    /// Whether `[start, end]` lies entirely inside the period
    pub fn covers(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start >= self.from_utc() && end <= self.to_utc()
    }
}

/// Validated, immutable run configuration
///
/// Built once per run by [`RawOptions::build`] and threaded by reference
/// through every stage.
#[derive(Clone, Debug)]
pub struct Options {
    pub scope: ScopeKind,
    pub timezone: FixedOffset,
    pub frequency: Frequency,
    pub period: Period,
    pub client_id: String,
    pub fleet_id: Option<u64>,
    pub recipients: Vec<String>,
    pub cc: Vec<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub file_name: String,
    pub subject: String,
    pub language: String,
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// A scope type: produces the scope dataset and the field providers that
/// can enrich it
pub trait ScopeSource {
    fn kind(&self) -> ScopeKind;

    /// Fetch every eligible scope entity with its intrinsic fields
    fn fetch_scope_data(&self, options: &Options) -> Result<ScopeDataSet>;

    /// Fields `fetch_scope_data` supplies itself. A record may still lack
    /// one of them; its cell then falls back like any absent value.
    fn intrinsic_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Batch providers for the derived fields of this scope type
    fn field_providers(&self) -> FieldProviderRegistry<'_>;
}

/// Serializes a rendered grid into a spreadsheet artifact
pub trait SheetWriter {
    /// MIME type of the produced artifact
    fn content_type(&self) -> &'static str;

    fn write(&self, grid: &SheetGrid) -> Result<Vec<u8>>;
}

/// Outbound mail delivery
pub trait Mailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Resolves numeric time zone identifiers to UTC offsets
pub trait TimezoneDirectory {
    fn offset(&self, timezone_id: u32) -> Result<Option<FixedOffset>>;
}

// ============================================================================
// Errors
// ============================================================================

/// Report run error
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data field \"{0}\" not supported")]
    UnsupportedField(String),

    #[error("Formatter \"{formatter}\" failed: {message}")]
    Formatter { formatter: String, message: String },

    #[error("Data store error: {0}")]
    Store(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Whether the run was rejected before touching any data
    pub fn is_configuration(&self) -> bool {
        matches!(self, ReportError::Configuration(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn value_display() {
        assert_eq!(Value::from(42).to_string(), "42");
        assert_eq!(Value::from(12.5).to_string(), "12.5");
        assert_eq!(Value::from("abc").to_string(), "abc");
    }

    #[test]
    fn value_deserializes_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[1, 2.5, "x"]"#).unwrap();
        assert_eq!(values, vec![Value::Integer(1), Value::Decimal(2.5), Value::from("x")]);
    }

    #[test]
    fn dataset_keeps_insertion_order() {
        let mut data = ScopeDataSet::new();
        data.insert(30, ScopeRecord::new().with("domain", "C"));
        data.insert(10, ScopeRecord::new().with("domain", "A"));
        data.insert(20, ScopeRecord::new().with("domain", "B"));

        assert_eq!(data.ids(), vec![30, 10, 20]);
        assert_eq!(
            data.representative().and_then(|r| r.get("domain")),
            Some(&Value::from("C"))
        );
    }

    #[test]
    fn scope_kind_parses() {
        assert_eq!("holder".parse::<ScopeKind>().unwrap(), ScopeKind::Holder);
        assert_eq!("contact".parse::<ScopeKind>().unwrap(), ScopeKind::Contact);
        assert!("asset".parse::<ScopeKind>().unwrap_err().is_configuration());
    }

    #[test]
    fn monthly_period_in_local_time() {
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        // 02:00 UTC on the 15th is still the 14th in UTC-3
        let period = Period::ending_at(utc(2024, 5, 15, 2), tz, Frequency::Monthly).unwrap();

        assert_eq!(period.from.to_string(), "2024-04-14 00:00:00 -03:00");
        assert_eq!(period.to.to_string(), "2024-05-14 23:59:59 -03:00");
    }

    #[test]
    fn weekly_period() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let period = Period::ending_at(utc(2024, 3, 5, 12), tz, Frequency::Weekly).unwrap();

        assert_eq!(period.from.to_string(), "2024-02-27 00:00:00 +00:00");
        assert_eq!(period.to.to_string(), "2024-03-05 23:59:59 +00:00");
    }

    #[test]
    fn monthly_period_clamps_short_month() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let period = Period::ending_at(utc(2023, 3, 31, 12), tz, Frequency::Monthly).unwrap();
        assert_eq!(period.from.date_naive(), NaiveDate::from_ymd_opt(2023, 2, 28).unwrap());
    }

    #[test]
    fn period_covers() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let period = Period::ending_at(utc(2024, 3, 5, 12), tz, Frequency::Weekly).unwrap();

        assert!(period.covers(utc(2024, 3, 1, 0), utc(2024, 3, 1, 23)));
        assert!(!period.covers(utc(2024, 2, 26, 0), utc(2024, 2, 28, 0)));
        assert!(!period.covers(utc(2024, 3, 5, 0), utc(2024, 3, 6, 0)));
    }

    #[test]
    fn unsupported_field_message_names_field() {
        let err = ReportError::UnsupportedField("fuelUsed".into());
        assert_eq!(err.to_string(), "Data field \"fuelUsed\" not supported");
    }
}
