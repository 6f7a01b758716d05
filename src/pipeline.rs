//! Search → extract → aggregate → chart, for one request.

use crate::config::Config;
use crate::domain::email::{
    ChartArtifact, Credential, DailyCounts, DatedRecord, Diagnostic, MessageRecord,
};
use crate::error::PipelineError;
use crate::mail::MailboxConnector;
use crate::mail::extractor::extract_record;
use crate::report::aggregate::aggregate;
use crate::report::chart::{ChartSettings, render_daily_counts};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub mailbox: String,
    pub chart: ChartSettings,
}

impl From<&Config> for PipelineSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            mailbox: cfg.imap.mailbox.clone(),
            chart: ChartSettings::from(&cfg.chart),
        }
    }
}

/// Records pulled from the mailbox plus the messages that were skipped.
#[derive(Debug, Default)]
pub struct Harvest {
    pub records: Vec<MessageRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Default)]
pub struct Report {
    pub search: String,
    pub rows: Vec<DatedRecord>,
    pub dropped: Vec<MessageRecord>,
    pub counts: DailyCounts,
    pub diagnostics: Vec<Diagnostic>,
    pub chart: Option<ChartArtifact>,
}

impl Report {
    fn empty(search: &str) -> Self {
        Self {
            search: search.to_string(),
            ..Self::default()
        }
    }
}

/// Logs in, searches by subject and extracts a record from each hit.
///
/// Login, mailbox selection and search failures abort the run. A message
/// that cannot be fetched or parsed becomes a diagnostic instead.
pub fn harvest(
    connector: &dyn MailboxConnector,
    credential: &Credential,
    mailbox: &str,
    search: &str,
) -> Result<Harvest, PipelineError> {
    let mut session = connector.open(credential)?;

    let ids = match session
        .select_mailbox(mailbox)
        .and_then(|()| session.search_subject(search))
    {
        Ok(ids) => ids,
        Err(e) => {
            session.close();
            return Err(e);
        }
    };
    log::info!("{} messages match \"{search}\"", ids.len());

    let mut out = Harvest::default();
    for id in ids {
        match session.fetch(id).and_then(|raw| extract_record(&raw)) {
            Ok(record) => out.records.push(record),
            Err(e) => {
                log::warn!("Skipping message {id}: {e}");
                out.diagnostics.push(Diagnostic {
                    id: e.id(),
                    message: e.to_string(),
                });
            }
        }
    }

    session.close();
    Ok(out)
}

/// Runs the whole pipeline.
///
/// Only missing credentials are returned as an error. Mailbox failures are
/// logged and produce an empty report; chart failures leave `chart` unset.
pub fn run(
    connector: &dyn MailboxConnector,
    email: Option<&str>,
    password: Option<&str>,
    search: &str,
    settings: &PipelineSettings,
) -> Result<Report, PipelineError> {
    let credential = Credential::from_inputs(email, password)?;

    let harvest = match harvest(connector, &credential, &settings.mailbox, search) {
        Ok(h) => h,
        Err(e) => {
            log::warn!("Mailbox query failed: {e}");
            return Ok(Report::empty(search));
        }
    };

    let aggregation = aggregate(&harvest.records);
    log::info!(
        "{} dated rows over {} days, {} dropped, {} skipped",
        aggregation.rows.len(),
        aggregation.counts.len(),
        aggregation.dropped.len(),
        harvest.diagnostics.len()
    );

    let chart = match render_daily_counts(&aggregation.counts, search, &settings.chart) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Chart rendering failed: {e}");
            None
        }
    };

    Ok(Report {
        search: search.to_string(),
        rows: aggregation.rows,
        dropped: aggregation.dropped,
        counts: aggregation.counts,
        diagnostics: harvest.diagnostics,
        chart,
    })
}
