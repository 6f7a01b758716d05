use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::error::PipelineError;

/// Server-assigned sequence number of a message in the selected mailbox.
pub type EmailId = u32;

/// Messages per calendar day, ascending by date.
pub type DailyCounts = BTreeMap<NaiveDate, usize>;

/// Mailbox login supplied with a single request. Never persisted.
#[derive(Debug)]
pub struct Credential {
    address: String,
    secret: SecretString,
}

impl Credential {
    /// Builds a credential from raw form or environment input.
    /// Empty values are treated the same as absent ones.
    pub fn from_inputs(
        address: Option<&str>,
        secret: Option<&str>,
    ) -> Result<Self, PipelineError> {
        let address = address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(PipelineError::Config("email address"))?;
        let secret = secret
            .filter(|s| !s.is_empty())
            .ok_or(PipelineError::Config("password"))?;

        Ok(Self {
            address: address.to_string(),
            secret: SecretString::from(secret.to_string()),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

#[derive(Debug, Clone)]
pub struct RawMessage {
    pub id: EmailId,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: EmailId,
    /// `Date` header exactly as the message carried it.
    pub date: String,
    pub subject: String,
}

/// A record whose date parsed to a UTC timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedRecord {
    pub record: MessageRecord,
    pub timestamp: DateTime<Utc>,
}

impl DatedRecord {
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// A message that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub id: EmailId,
    pub message: String,
}

/// A chart written to disk and the URL it is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub path: PathBuf,
    pub url: String,
}
