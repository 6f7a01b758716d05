pub mod decoders;
pub mod extractor;
pub mod imap_client;

use crate::domain::email::{Credential, EmailId, RawMessage};
use crate::error::{ExtractionError, PipelineError};

/// Opens authenticated mailbox sessions.
pub trait MailboxConnector: Send + Sync {
    /// Connects and logs in. Fails with `Connect` or `Auth`.
    fn open(&self, credential: &Credential) -> Result<Box<dyn MailboxSession>, PipelineError>;
}

/// One logged-in mailbox session, used for a single pipeline run.
pub trait MailboxSession {
    fn select_mailbox(&mut self, name: &str) -> Result<(), PipelineError>;

    /// Ids of messages whose subject contains `term`, ascending.
    fn search_subject(&mut self, term: &str) -> Result<Vec<EmailId>, PipelineError>;

    fn fetch(&mut self, id: EmailId) -> Result<RawMessage, ExtractionError>;

    /// Ends the session. Errors are logged, never returned.
    fn close(self: Box<Self>);
}
