use std::net::TcpStream;
use std::time::Duration;

use native_tls::{TlsConnector, TlsStream};

use crate::config::ImapConfig;
use crate::domain::email::{Credential, EmailId, RawMessage};
use crate::error::{ExtractionError, PipelineError};
use crate::mail::decoders::subject_search_query;
use crate::mail::{MailboxConnector, MailboxSession};

type TlsSession = imap::Session<TlsStream<TcpStream>>;

/// IMAP over implicit TLS.
pub struct ImapClient {
    pub server: String,
    pub port: u16,
    pub read_timeout: Option<Duration>,
}

impl ImapClient {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            read_timeout: None,
        }
    }

    pub fn from_config(cfg: &ImapConfig) -> Self {
        Self {
            server: cfg.server.clone(),
            port: cfg.port,
            read_timeout: cfg.read_timeout(),
        }
    }

    fn connect_err(&self, reason: impl ToString) -> PipelineError {
        PipelineError::Connect {
            server: format!("{}:{}", self.server, self.port),
            reason: reason.to_string(),
        }
    }

    fn connect(&self) -> Result<imap::Client<TlsStream<TcpStream>>, PipelineError> {
        log::debug!("Connecting to {}:{}", self.server, self.port);
        let tcp = TcpStream::connect((self.server.as_str(), self.port))
            .map_err(|e| self.connect_err(e))?;
        tcp.set_read_timeout(self.read_timeout)
            .map_err(|e| self.connect_err(e))?;

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| self.connect_err(e))?;
        let stream = tls
            .connect(self.server.as_str(), tcp)
            .map_err(|e| self.connect_err(e))?;

        let mut client = imap::Client::new(stream);
        client.read_greeting().map_err(|e| self.connect_err(e))?;
        Ok(client)
    }
}

impl MailboxConnector for ImapClient {
    fn open(&self, credential: &Credential) -> Result<Box<dyn MailboxSession>, PipelineError> {
        let client = self.connect()?;
        let session = client
            .login(credential.address(), credential.secret())
            .map_err(|(e, _client)| PipelineError::Auth(e.to_string()))?;
        log::info!("Logged in to {} as {}", self.server, credential.address());
        Ok(Box::new(ImapSession { session }))
    }
}

struct ImapSession {
    session: TlsSession,
}

impl MailboxSession for ImapSession {
    fn select_mailbox(&mut self, name: &str) -> Result<(), PipelineError> {
        let mailbox = self
            .session
            .select(name)
            .map_err(|e| PipelineError::Mailbox {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        log::debug!("{} has {} messages", name, mailbox.exists);
        Ok(())
    }

    fn search_subject(&mut self, term: &str) -> Result<Vec<EmailId>, PipelineError> {
        let query = subject_search_query(term);
        let mut ids: Vec<EmailId> = self
            .session
            .search(&query)
            .map_err(|e| PipelineError::Search(e.to_string()))?
            .into_iter()
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch(&mut self, id: EmailId) -> Result<RawMessage, ExtractionError> {
        let fetches = self
            .session
            .fetch(id.to_string(), "RFC822")
            .map_err(|e| ExtractionError::Fetch {
                id,
                reason: e.to_string(),
            })?;

        let bytes = fetches
            .iter()
            .find_map(|f| f.body())
            .ok_or_else(|| ExtractionError::Fetch {
                id,
                reason: "server returned no message body".to_string(),
            })?
            .to_vec();

        Ok(RawMessage { id, bytes })
    }

    fn close(mut self: Box<Self>) {
        if let Err(e) = self.session.close() {
            log::warn!("CLOSE failed: {e}");
        }
        if let Err(e) = self.session.logout() {
            log::warn!("LOGOUT failed: {e}");
        }
    }
}
