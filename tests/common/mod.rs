#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use mail_tally::domain::email::{Credential, EmailId, RawMessage};
use mail_tally::error::{ExtractionError, PipelineError};
use mail_tally::mail::{MailboxConnector, MailboxSession};

/// Where the fake mailbox should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Failure {
    #[default]
    None,
    Connect,
    Auth,
    Select,
    Search,
}

/// What the fake observed, for assertions.
#[derive(Debug, Default)]
pub struct Calls {
    pub opened: usize,
    pub closed: usize,
    pub searched: Vec<String>,
    pub fetched: Vec<EmailId>,
}

/// In-memory mailbox. Messages match a search when their subject line
/// contains the term; ids listed in `unfetchable` fail on fetch.
#[derive(Clone, Default)]
pub struct FakeMailbox {
    pub messages: BTreeMap<EmailId, String>,
    pub unfetchable: Vec<EmailId>,
    pub failure: Failure,
    pub calls: Arc<Mutex<Calls>>,
}

impl FakeMailbox {
    pub fn with_messages(messages: &[(EmailId, &str, &str)]) -> Self {
        let messages = messages
            .iter()
            .map(|(id, date, subject)| (*id, message(date, subject)))
            .collect();
        Self {
            messages,
            ..Self::default()
        }
    }
}

pub fn message(date: &str, subject: &str) -> String {
    format!("From: someone@example.com\r\nDate: {date}\r\nSubject: {subject}\r\n\r\nbody\r\n")
}

impl MailboxConnector for FakeMailbox {
    fn open(&self, credential: &Credential) -> Result<Box<dyn MailboxSession>, PipelineError> {
        match self.failure {
            Failure::Connect => {
                return Err(PipelineError::Connect {
                    server: "fake".to_string(),
                    reason: "refused".to_string(),
                });
            }
            Failure::Auth => return Err(PipelineError::Auth("bad password".to_string())),
            _ => {}
        }
        assert!(!credential.address().is_empty());
        self.calls.lock().unwrap().opened += 1;
        Ok(Box::new(self.clone()))
    }
}

impl MailboxSession for FakeMailbox {
    fn select_mailbox(&mut self, name: &str) -> Result<(), PipelineError> {
        if self.failure == Failure::Select {
            return Err(PipelineError::Mailbox {
                name: name.to_string(),
                reason: "no such mailbox".to_string(),
            });
        }
        Ok(())
    }

    fn search_subject(&mut self, term: &str) -> Result<Vec<EmailId>, PipelineError> {
        if self.failure == Failure::Search {
            return Err(PipelineError::Search("BAD".to_string()));
        }
        self.calls.lock().unwrap().searched.push(term.to_string());
        Ok(self
            .messages
            .iter()
            .filter(|(_, text)| {
                text.lines()
                    .any(|l| l.starts_with("Subject:") && l.contains(term))
            })
            .map(|(id, _)| *id)
            .collect())
    }

    fn fetch(&mut self, id: EmailId) -> Result<RawMessage, ExtractionError> {
        self.calls.lock().unwrap().fetched.push(id);
        if self.unfetchable.contains(&id) {
            return Err(ExtractionError::Fetch {
                id,
                reason: "connection reset".to_string(),
            });
        }
        let text = self.messages.get(&id).ok_or(ExtractionError::Fetch {
            id,
            reason: "no such message".to_string(),
        })?;
        Ok(RawMessage {
            id,
            bytes: text.as_bytes().to_vec(),
        })
    }

    fn close(self: Box<Self>) {
        self.calls.lock().unwrap().closed += 1;
    }
}
