//! Report pipeline
//!
//! Sequential run: scope fetch -> field resolution -> sheet layout ->
//! serialization -> delivery. Any failing stage aborts the run, so a
//! report is either delivered complete or not at all.

use serde::Serialize;
use tracing::info;

use crate::resolve::Resolution;
use crate::{
    FormatterRegistry, Mailer, Messages, Options, ReportError, Result, Resolver, ScopeSource,
    SheetGrid, SheetRenderer, SheetWriter,
};

/// Timestamp layout used in mail subjects
pub const SUBJECT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// File attached to the report mail
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Mail handed to a [`Mailer`]
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub attachment: Attachment,
}

/// Everything a run produced before delivery
#[derive(Clone, Debug)]
pub struct PreparedReport {
    pub grid: SheetGrid,
    pub mail: OutgoingMail,
    pub resolution: Resolution,
    pub scopes: usize,
}

/// What a delivered run did
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportSummary {
    pub scopes: usize,
    pub rows: usize,
    pub provider_calls: usize,
    pub subject: String,
    pub recipients: usize,
    pub attachment_bytes: usize,
}

/// Wires a scope type, formatters and a sheet writer into report runs
pub struct ReportPipeline<'a> {
    scope: &'a dyn ScopeSource,
    formatters: &'a FormatterRegistry,
    writer: &'a dyn SheetWriter,
}

impl<'a> ReportPipeline<'a> {
    pub fn new(
        scope: &'a dyn ScopeSource,
        formatters: &'a FormatterRegistry,
        writer: &'a dyn SheetWriter,
    ) -> Self {
        Self {
            scope,
            formatters,
            writer,
        }
    }

    /// Fetch, resolve and lay out the report sheet
    pub fn assemble(&self, options: &Options) -> Result<(SheetGrid, Resolution, usize)> {
        if options.scope != self.scope.kind() {
            return Err(ReportError::Configuration(format!(
                "Options target scope '{}' but the pipeline serves '{}'",
                options.scope,
                self.scope.kind()
            )));
        }

        let mut data = self.scope.fetch_scope_data(options)?;
        info!(scope = %options.scope, client = %options.client_id, scopes = data.len(), "fetched scopes");

        let providers = self.scope.field_providers();
        let resolution = Resolver::new(&providers)
            .with_intrinsic(self.scope.intrinsic_fields())
            .resolve(options, &mut data)?;
        info!(fields = resolution.provider_calls(), "resolved derived fields");

        let messages = Messages::for_language(&options.language);
        let grid = SheetRenderer::new(&messages, self.formatters).render(&options.columns, &data)?;
        info!(rows = grid.rows.len(), columns = grid.column_count(), "rendered sheet");

        Ok((grid, resolution, data.len()))
    }

    /// Assemble the sheet, serialize it and build the outgoing mail
    pub fn prepare(&self, options: &Options) -> Result<PreparedReport> {
        let (grid, resolution, scopes) = self.assemble(options)?;
        let content = self.writer.write(&grid)?;
        info!(bytes = content.len(), file = %options.file_name, "serialized report");

        let mail = OutgoingMail {
            to: options.recipients.clone(),
            cc: options.cc.clone(),
            subject: subject_line(options),
            body: " ".to_string(),
            attachment: Attachment {
                file_name: options.file_name.clone(),
                content_type: self.writer.content_type().to_string(),
                content,
            },
        };

        Ok(PreparedReport {
            grid,
            mail,
            resolution,
            scopes,
        })
    }

    /// Full run: prepare and hand the mail to `mailer`
    pub fn run(&self, options: &Options, mailer: &dyn Mailer) -> Result<ReportSummary> {
        let prepared = self.prepare(options)?;
        mailer.send(&prepared.mail)?;
        info!(recipients = prepared.mail.to.len(), subject = %prepared.mail.subject, "report delivered");

        Ok(ReportSummary {
            scopes: prepared.scopes,
            rows: prepared.grid.rows.len(),
            provider_calls: prepared.resolution.provider_calls(),
            subject: prepared.mail.subject,
            recipients: prepared.mail.to.len() + prepared.mail.cc.len(),
            attachment_bytes: prepared.mail.attachment.content.len(),
        })
    }
}

/// `<subject> - <from> - <to>`
pub fn subject_line(options: &Options) -> String {
    format!(
        "{} - {} - {}",
        options.subject,
        options.period.from.format(SUBJECT_DATE_FORMAT),
        options.period.to.format(SUBJECT_DATE_FORMAT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::options_with;
    use crate::ColumnDescriptor;

    #[test]
    fn subject_embeds_period() {
        let mut options = options_with(vec![ColumnDescriptor::new("domain")]);
        options.subject = "REPORTE DESEMPENHO".into();

        assert_eq!(
            subject_line(&options),
            "REPORTE DESEMPENHO - 2024-04-14 00:00:00 - 2024-05-14 23:59:59"
        );
    }
}
