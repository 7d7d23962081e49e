//! Named value formatters applied to simple columns

use std::collections::BTreeMap;

use crate::{ReportError, Result, Value};

/// A pure value transform; the error string explains the rejected value
pub type FormatterFn = fn(&Value) -> std::result::Result<String, String>;

/// Fixed set of formatters addressable by name from column specs
#[derive(Clone, Debug)]
pub struct FormatterRegistry {
    formatters: BTreeMap<&'static str, FormatterFn>,
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("time", format_time);
        registry
    }
}

impl FormatterRegistry {
    /// Registry with the built-in formatters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            formatters: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, formatter: FormatterFn) {
        self.formatters.insert(name, formatter);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.formatters.keys().copied()
    }

    pub fn apply(&self, name: &str, value: &Value) -> Result<String> {
        let formatter = self.formatters.get(name).ok_or_else(|| {
            ReportError::Configuration(format!("Formatter \"{name}\" is not registered"))
        })?;
        formatter(value).map_err(|message| ReportError::Formatter {
            formatter: name.to_string(),
            message,
        })
    }
}

/// Seconds as `HH:MM:SS`; hours keep growing past 99
pub fn format_seconds(total: u64) -> String {
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

fn format_time(value: &Value) -> std::result::Result<String, String> {
    let seconds = value
        .as_f64()
        .filter(|s| s.is_finite())
        .ok_or_else(|| format!("expected a number of seconds, got '{value}'"))?;
    Ok(format_seconds(seconds.max(0.0) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_seconds_pads() {
        assert_eq!(format_seconds(0), "00:00:00");
        assert_eq!(format_seconds(59), "00:00:59");
        assert_eq!(format_seconds(3665), "01:01:05");
        assert_eq!(format_seconds(360_000), "100:00:00");
    }

    #[test]
    fn time_formatter_accepts_numbers_and_numeric_text() {
        let registry = FormatterRegistry::new();
        assert_eq!(registry.apply("time", &Value::from(3665)).unwrap(), "01:01:05");
        assert_eq!(registry.apply("time", &Value::from(3665.9)).unwrap(), "01:01:05");
        assert_eq!(registry.apply("time", &Value::from("120")).unwrap(), "00:02:00");
    }

    #[test]
    fn time_formatter_rejects_text() {
        let err = FormatterRegistry::new()
            .apply("time", &Value::from("soon"))
            .unwrap_err();
        assert!(matches!(err, ReportError::Formatter { ref formatter, .. } if formatter == "time"));
    }

    #[test]
    fn unknown_formatter_is_configuration_error() {
        let err = FormatterRegistry::new()
            .apply("currency", &Value::from(1))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("currency"));
    }

    #[test]
    fn custom_formatters_can_be_registered() {
        fn upper(value: &Value) -> std::result::Result<String, String> {
            Ok(value.to_string().to_uppercase())
        }

        let mut registry = FormatterRegistry::empty();
        assert!(!registry.contains("upper"));
        registry.register("upper", upper);
        assert_eq!(registry.apply("upper", &Value::from("ab")).unwrap(), "AB");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["upper"]);
    }
}
