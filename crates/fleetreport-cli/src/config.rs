//! TOML configuration file
//!
//! ```toml
//! store = "fleet.json"
//! outbox = "outbox"
//! sender = "reports@example.com"
//! language = "pt"
//! ```
//!
//! Every key is optional. Command-line flags win over the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "fleetreport.toml";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Fleet snapshot the store reads
    pub store: PathBuf,
    /// Directory delivered mail is written to
    pub outbox: PathBuf,
    pub sender: String,
    /// Report language when `--lang` is absent
    pub language: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            store: PathBuf::from("fleet.json"),
            outbox: PathBuf::from("outbox"),
            sender: "reports@localhost".to_string(),
            language: fleetreport_core::i18n::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl ReportConfig {
    /// Load `explicit`, or the default file if present, or built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.toml");
        std::fs::write(&path, "sender = \"fleet@example.com\"\nlanguage = \"es\"\n").unwrap();

        let config = ReportConfig::load(Some(&path)).unwrap();
        assert_eq!(
            config,
            ReportConfig {
                sender: "fleet@example.com".into(),
                language: "es".into(),
                ..ReportConfig::default()
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.toml");
        std::fs::write(&path, "smtp = \"mail.example.com\"\n").unwrap();

        let err = ReportConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid config file"));
    }

    #[test]
    fn explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReportConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
