//! Run option validation
//!
//! [`RawOptions`] mirrors the command surface: every parameter is an
//! optional string. [`RawOptions::build`] validates it into an immutable
//! [`Options`]; any failure is a [`ReportError::Configuration`] raised
//! before a single scope is fetched.

use chrono::{DateTime, Utc};

use crate::i18n::{Messages, DEFAULT_LANGUAGE};
use crate::{
    parse_columns, Frequency, FormatterRegistry, Options, Period, ReportError, Result, ScopeKind,
    TimezoneDirectory,
};

/// Unvalidated run parameters
#[derive(Clone, Debug, Default)]
pub struct RawOptions {
    pub scope: Option<String>,
    pub timezone: Option<String>,
    pub frequency: Option<String>,
    pub client_id: Option<String>,
    pub fleet_id: Option<String>,
    pub recipients: Option<String>,
    pub cc: Option<String>,
    pub columns: Option<String>,
    pub language: Option<String>,
    pub file_name: Option<String>,
    pub subject: Option<String>,
}

impl RawOptions {
    /// Validate into [`Options`]; `now` anchors the report period
    pub fn build(
        &self,
        zones: &dyn TimezoneDirectory,
        formatters: &FormatterRegistry,
        now: DateTime<Utc>,
    ) -> Result<Options> {
        let scope = match present(&self.scope) {
            Some(scope) => scope.parse::<ScopeKind>()?,
            None => ScopeKind::Holder,
        };

        let timezone_id = required(&self.timezone, "timezone")?;
        let timezone = timezone_id
            .parse::<u32>()
            .ok()
            .map(|id| zones.offset(id))
            .transpose()?
            .flatten()
            .ok_or_else(|| {
                ReportError::Configuration(format!(
                    "The timezone parameter '{timezone_id}' is incorrect or does not exist"
                ))
            })?;

        let frequency: Frequency = required(&self.frequency, "frequency")?.parse()?;

        let messages = Messages::for_language(present(&self.language).unwrap_or(DEFAULT_LANGUAGE));
        let file_name = present(&self.file_name)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}.xlsx", messages.report_title()));
        let subject = present(&self.subject)
            .unwrap_or(messages.report_title())
            .to_string();

        let period = Period::ending_at(now, timezone, frequency)?;

        let client_id = required(&self.client_id, "clientid")?.to_string();

        let fleet_id = match self.fleet_id.as_deref().map(str::trim) {
            None => None,
            Some(raw) => match raw.parse::<u64>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    return Err(ReportError::Configuration(format!(
                        "Parameter 'fleetId' must be numeric and greater than zero, got '{raw}'"
                    )))
                }
            },
        };

        let recipients = address_list(required(&self.recipients, "recipients")?, "recipients")?;
        if recipients.is_empty() {
            return Err(ReportError::Configuration(
                "Parameter 'recipients' must list at least one address".into(),
            ));
        }
        let cc = match present(&self.cc) {
            Some(raw) => address_list(raw, "cc")?,
            None => Vec::new(),
        };

        let columns = parse_columns(required(&self.columns, "columns")?)?;
        for column in &columns {
            if let Some(name) = column.formatter.as_deref() {
                if !formatters.contains(name) {
                    return Err(ReportError::Configuration(format!(
                        "Column '{}' uses unknown formatter \"{name}\"",
                        column.data_field
                    )));
                }
            }
        }

        Ok(Options {
            scope,
            timezone,
            frequency,
            period,
            client_id,
            fleet_id,
            recipients,
            cc,
            columns,
            file_name,
            subject,
            language: messages.language().to_string(),
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    present(value).ok_or_else(|| ReportError::Configuration(format!("Parameter '{name}' is required")))
}

fn address_list(raw: &str, name: &str) -> Result<Vec<String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(|address| {
            if address.contains('@') && !address.contains(char::is_whitespace) {
                Ok(address.to_string())
            } else {
                Err(ReportError::Configuration(format!(
                    "Parameter '{name}' contains an invalid address: '{address}'"
                )))
            }
        })
        .collect()
}
