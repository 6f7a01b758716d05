//! Error types for the search-and-tally pipeline.

use crate::domain::email::EmailId;

/// Failures that end a pipeline run.
///
/// `Config` is reported back to the caller. Every other variant is a
/// mailbox failure, which the pipeline logs and turns into an empty report.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Missing required input: {0}")]
    Config(&'static str),

    #[error("Could not connect to {server}: {reason}")]
    Connect { server: String, reason: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Could not select mailbox {name}: {reason}")]
    Mailbox { name: String, reason: String },

    #[error("Search failed: {0}")]
    Search(String),
}

impl PipelineError {
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Failure to turn one message into a record. Never aborts a batch.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Fetch of message {id} failed: {reason}")]
    Fetch { id: EmailId, reason: String },

    #[error("Message {id} is not parseable: {reason}")]
    Parse { id: EmailId, reason: String },
}

impl ExtractionError {
    pub fn id(&self) -> EmailId {
        match self {
            Self::Fetch { id, .. } | Self::Parse { id, .. } => *id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Drawing failed: {0}")]
    Draw(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No config directory available on this platform")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}
