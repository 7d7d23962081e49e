//! fleetreport CLI - Periodic Fleet Performance Reports
//!
//! Builds the performance spreadsheet for a client's holders or contacts
//! and mails it to the configured recipients.

mod config;
mod mail;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use fleetreport_core::{FormatterRegistry, RawOptions, ReportPipeline};
use fleetreport_render::XlsxSheetWriter;
use fleetreport_scopes::{scope_source, JsonFleetStore};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ReportConfig;
use crate::mail::OutboxMailer;

#[derive(Parser)]
#[command(name = "fleetreport")]
#[command(author, version, about = "Periodic fleet performance reports", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ./fleetreport.toml when present)
    #[arg(long, env = "FLEETREPORT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fleet snapshot to read
    #[arg(long, env = "FLEETREPORT_STORE", value_name = "FILE")]
    store: Option<PathBuf>,

    /// Directory delivered mail is written to
    #[arg(long, env = "FLEETREPORT_OUTBOX", value_name = "DIR")]
    outbox: Option<PathBuf>,

    /// Sender address
    #[arg(long, env = "FLEETREPORT_SENDER")]
    sender: Option<String>,

    /// Report rows: holder or contact
    #[arg(long, env = "FLEETREPORT_SCOPE")]
    scope: Option<String>,

    /// Numeric time zone identifier
    #[arg(long, env = "FLEETREPORT_TIMEZONE")]
    timezone: Option<String>,

    /// Report period: weekly or monthly
    #[arg(long, env = "FLEETREPORT_FREQUENCY")]
    frequency: Option<String>,

    /// Client identifier
    #[arg(long = "clientid", env = "FLEETREPORT_CLIENTID")]
    client_id: Option<String>,

    /// Restrict the report to one fleet
    #[arg(long = "fleetId", env = "FLEETREPORT_FLEET_ID")]
    fleet_id: Option<String>,

    /// Comma-separated recipient addresses
    #[arg(long, env = "FLEETREPORT_RECIPIENTS")]
    recipients: Option<String>,

    /// Comma-separated carbon copy addresses
    #[arg(long, env = "FLEETREPORT_CC")]
    cc: Option<String>,

    /// Column specification (JSON array)
    #[arg(long, env = "FLEETREPORT_COLUMNS")]
    columns: Option<String>,

    /// Report language (pt, es, en)
    #[arg(long = "lang", env = "FLEETREPORT_LANG")]
    language: Option<String>,

    /// Attachment file name
    #[arg(long = "fileName", env = "FLEETREPORT_FILE_NAME")]
    file_name: Option<String>,

    /// Mail subject, followed by the report period
    #[arg(long, env = "FLEETREPORT_SUBJECT")]
    subject: Option<String>,

    /// Write the spreadsheet without sending mail
    #[arg(long)]
    dry_run: bool,

    /// Spreadsheet path for --dry-run (default: the attachment file name)
    #[arg(short, long, requires = "dry_run", value_name = "FILE")]
    output: Option<PathBuf>,
}

impl Cli {
    fn raw_options(&self, config: &ReportConfig) -> RawOptions {
        RawOptions {
            scope: self.scope.clone(),
            timezone: self.timezone.clone(),
            frequency: self.frequency.clone(),
            client_id: self.client_id.clone(),
            fleet_id: self.fleet_id.clone(),
            recipients: self.recipients.clone(),
            cc: self.cc.clone(),
            columns: self.columns.clone(),
            language: self.language.clone().or_else(|| Some(config.language.clone())),
            file_name: self.file_name.clone(),
            subject: self.subject.clone(),
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ReportConfig::load(cli.config.as_deref())?;
    let store_path = cli.store.clone().unwrap_or_else(|| config.store.clone());
    let store = JsonFleetStore::load(&store_path)
        .with_context(|| format!("Cannot open fleet store {}", store_path.display()))?;

    let formatters = FormatterRegistry::new();
    let options = cli
        .raw_options(&config)
        .build(&store, &formatters, Utc::now())
        .context("Invalid report options")?;
    info!(scope = %options.scope, columns = options.columns.len(), "options built");

    let scope = scope_source(options.scope, &store);
    let writer = XlsxSheetWriter::new();
    let pipeline = ReportPipeline::new(scope.as_ref(), &formatters, &writer);

    if cli.dry_run {
        let prepared = pipeline.prepare(&options).context("Report failed")?;
        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&options.file_name));
        std::fs::write(&output, &prepared.mail.attachment.content)
            .with_context(|| format!("Cannot write {}", output.display()))?;
        println!(
            "Wrote {} ({} rows, {} bytes)",
            output.display(),
            prepared.grid.rows.len(),
            prepared.mail.attachment.content.len()
        );
        println!("Subject: {}", prepared.mail.subject);
        return Ok(());
    }

    let outbox = cli.outbox.clone().unwrap_or_else(|| config.outbox.clone());
    let sender = cli.sender.clone().unwrap_or_else(|| config.sender.clone());
    let mailer = OutboxMailer::new(outbox, sender);
    let summary = pipeline.run(&options, &mailer).context("Report failed")?;

    println!(
        "Delivered \"{}\" to {} recipient(s): {} rows, {} bytes",
        summary.subject, summary.recipients, summary.rows, summary.attachment_bytes
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_language_fills_missing_lang() {
        let cli = Cli::parse_from(["fleetreport", "--timezone", "3"]);
        let config = ReportConfig {
            language: "es".into(),
            ..ReportConfig::default()
        };
        let raw = cli.raw_options(&config);
        assert_eq!(raw.language.as_deref(), Some("es"));
        assert_eq!(raw.timezone.as_deref(), Some("3"));

        let cli = Cli::parse_from(["fleetreport", "--lang", "en"]);
        assert_eq!(cli.raw_options(&config).language.as_deref(), Some("en"));
    }
}
