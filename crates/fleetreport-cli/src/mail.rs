//! Outbox mail delivery
//!
//! Each message becomes a directory under the outbox holding the
//! attachment and an `envelope.json` with the headers:
//!
//! ```text
//! outbox/
//!   20240515T120000-1/
//!     envelope.json
//!     Relatório de desempenho.xlsx
//! ```

use chrono::Utc;
use fleetreport_core::{Mailer, OutgoingMail, ReportError, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const ENVELOPE_FILE: &str = "envelope.json";

#[derive(Serialize)]
struct Envelope<'m> {
    from: &'m str,
    #[serde(flatten)]
    mail: &'m OutgoingMail,
    attachment_bytes: usize,
    created_at: String,
}

/// [`Mailer`] writing messages to a local directory
#[derive(Clone, Debug)]
pub struct OutboxMailer {
    dir: PathBuf,
    sender: String,
}

impl OutboxMailer {
    pub fn new(dir: impl Into<PathBuf>, sender: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            sender: sender.into(),
        }
    }

    /// Create a fresh message directory
    fn message_dir(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        for seq in 1.. {
            let candidate = self.dir.join(format!("{stamp}-{seq}"));
            match std::fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }
        }
        Err(ReportError::Delivery("Outbox is full".into()))
    }

    /// Fill a message directory, envelope first
    fn write_message(&self, dir: &Path, name: &str, mail: &OutgoingMail) -> Result<()> {
        let envelope = Envelope {
            from: &self.sender,
            mail,
            attachment_bytes: mail.attachment.content.len(),
            created_at: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| ReportError::Delivery(format!("Cannot encode envelope: {e}")))?;
        create_file(&dir.join(ENVELOPE_FILE), json.as_bytes())?;
        create_file(&dir.join(name), &mail.attachment.content)
    }
}

/// Write a file that must not exist yet
fn create_file(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content)?;
    Ok(())
}

/// Attachment names never escape the message directory
fn attachment_name(file_name: &str) -> Result<&str> {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ReportError::Delivery(format!("Invalid attachment name '{file_name}'")))
}

impl Mailer for OutboxMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        if mail.to.is_empty() {
            return Err(ReportError::Delivery("Mail has no recipients".into()));
        }
        let name = attachment_name(&mail.attachment.file_name)?;
        let dir = self.message_dir()?;

        if let Err(e) = self.write_message(&dir, name, mail) {
            // A partial message must not look deliverable
            let _ = std::fs::remove_dir_all(&dir);
            return Err(e);
        }

        info!(dir = %dir.display(), to = mail.to.len(), cc = mail.cc.len(), "mail written to outbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetreport_core::Attachment;
    use pretty_assertions::assert_eq;

    fn mail(file_name: &str) -> OutgoingMail {
        OutgoingMail {
            to: vec!["ops@example.com".into()],
            cc: vec!["boss@example.com".into()],
            subject: "REPORT - 2024-05-08 00:00:00 - 2024-05-15 23:59:59".into(),
            body: " ".into(),
            attachment: Attachment {
                file_name: file_name.into(),
                content_type: "text/plain".into(),
                content: b"hello".to_vec(),
            },
        }
    }

    fn message_dirs(outbox: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<_> = std::fs::read_dir(outbox)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        dirs.sort();
        dirs
    }

    #[test]
    fn writes_attachment_and_envelope() {
        let outbox = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(outbox.path(), "reports@example.com");
        mailer.send(&mail("report.txt")).unwrap();

        let dirs = message_dirs(outbox.path());
        assert_eq!(dirs.len(), 1);
        assert_eq!(std::fs::read(dirs[0].join("report.txt")).unwrap(), b"hello");

        let envelope: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dirs[0].join(ENVELOPE_FILE)).unwrap())
                .unwrap();
        assert_eq!(envelope["from"], "reports@example.com");
        assert_eq!(envelope["to"][0], "ops@example.com");
        assert_eq!(envelope["cc"][0], "boss@example.com");
        assert_eq!(envelope["body"], " ");
        assert_eq!(envelope["attachment"]["file_name"], "report.txt");
        assert_eq!(envelope["attachment_bytes"], 5);
    }

    #[test]
    fn each_message_gets_its_own_directory() {
        let outbox = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(outbox.path().join("nested"), "reports@example.com");
        mailer.send(&mail("a.txt")).unwrap();
        mailer.send(&mail("a.txt")).unwrap();

        assert_eq!(message_dirs(&outbox.path().join("nested")).len(), 2);
    }

    #[test]
    fn attachment_name_is_confined() {
        assert_eq!(attachment_name("../../etc/report.xlsx").unwrap(), "report.xlsx");
        assert!(attachment_name("..").is_err());
    }

    #[test]
    fn failed_write_leaves_no_message_behind() {
        let outbox = tempfile::tempdir().unwrap();
        let mailer = OutboxMailer::new(outbox.path(), "reports@example.com");

        assert!(mailer.send(&mail(ENVELOPE_FILE)).is_err());
        assert!(message_dirs(outbox.path()).is_empty());
    }

    #[test]
    fn no_recipients_is_refused() {
        let outbox = tempfile::tempdir().unwrap();
        let mut mail = mail("a.txt");
        mail.to.clear();
        let err = OutboxMailer::new(outbox.path(), "x@example.com").send(&mail).unwrap_err();
        assert!(matches!(err, ReportError::Delivery(_)));
        assert!(message_dirs(outbox.path()).is_empty());
    }
}
