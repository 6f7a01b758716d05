pub mod form;
pub mod pages;

use anyhow::{Result, anyhow};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tiny_http::{Header, Method, Request, Response, Server, SslConfig};

use crate::config::{Config, ServerConfig};
use crate::mail::MailboxConnector;
use crate::pipeline::{self, PipelineSettings};
use crate::report::chart::STATIC_URL_PREFIX;
use crate::web::form::SearchForm;

/// Largest form body accepted; three short fields fit well within it.
pub const MAX_FORM_BYTES: u64 = 64 * 1024;

/// Reads at most `limit` bytes of a request body. `Ok(None)` means the
/// body was longer than `limit`.
pub fn read_body(reader: impl Read, limit: u64) -> io::Result<Option<String>> {
    let mut body = String::new();
    reader.take(limit + 1).read_to_string(&mut body)?;
    if body.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(body))
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReplyBody {
    Html(String),
    File(PathBuf),
}

#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: ReplyBody,
}

impl Reply {
    fn html(status: u16, page: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: ReplyBody::Html(page),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::html(status, pages::error_page(status, message))
    }
}

/// The two-route search form plus the static chart directory.
pub struct App {
    connector: Box<dyn MailboxConnector>,
    settings: PipelineSettings,
    show_dropped: bool,
}

impl App {
    pub fn new(connector: Box<dyn MailboxConnector>, cfg: &Config) -> Self {
        Self {
            connector,
            settings: PipelineSettings::from(cfg),
            show_dropped: cfg.report.show_dropped_rows,
        }
    }

    /// Routes one request. `body` is the raw request body.
    pub fn handle(&self, method: &Method, url: &str, body: &str) -> Reply {
        let path = url.split('?').next().unwrap_or(url);
        log::debug!("{method} {path}");

        match (method, path) {
            (Method::Get, "/") => Reply::html(200, pages::form_page()),
            (Method::Post, "/") => self.search(body),
            (_, "/") => Reply::error(405, "Method not allowed."),
            (Method::Get, p) => match p
                .strip_prefix(STATIC_URL_PREFIX)
                .and_then(|rest| rest.strip_prefix('/'))
            {
                Some(name) => self.static_file(name),
                None => Reply::error(404, "Not found."),
            },
            _ => Reply::error(404, "Not found."),
        }
    }

    fn search(&self, body: &str) -> Reply {
        let form = SearchForm::parse(body);
        match pipeline::run(
            self.connector.as_ref(),
            form.email.as_deref(),
            form.password.as_deref(),
            &form.search,
            &self.settings,
        ) {
            Ok(report) => Reply::html(200, pages::results_page(&report, self.show_dropped)),
            Err(e) => {
                log::warn!("Rejected search request: {e}");
                Reply::error(400, "The request could not be processed.")
            }
        }
    }

    fn static_file(&self, name: &str) -> Reply {
        let safe = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        if !safe {
            return Reply::error(404, "Not found.");
        }

        let path = self.settings.chart.static_dir.join(name);
        if !path.is_file() {
            return Reply::error(404, "Not found.");
        }

        let content_type = match path.extension().and_then(|e| e.to_str()) {
            Some("svg") => "image/svg+xml",
            Some("png") => "image/png",
            _ => "application/octet-stream",
        };
        Reply {
            status: 200,
            content_type,
            body: ReplyBody::File(path),
        }
    }

    fn respond(&self, mut request: Request) {
        let reply = match read_body(request.as_reader(), MAX_FORM_BYTES) {
            Ok(Some(body)) => self.handle(request.method(), request.url(), &body),
            Ok(None) => {
                log::warn!("Request body over {MAX_FORM_BYTES} bytes rejected");
                Reply::error(413, "Request body too large.")
            }
            Err(e) => {
                log::warn!("Unreadable request body: {e}");
                Reply::error(400, "Unreadable request body.")
            }
        };

        let header = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()).ok();
        let result = match reply.body {
            ReplyBody::Html(page) => {
                let mut response = Response::from_string(page).with_status_code(reply.status);
                if let Some(h) = header {
                    response = response.with_header(h);
                }
                request.respond(response)
            }
            ReplyBody::File(path) => match File::open(&path) {
                Ok(file) => {
                    let mut response = Response::from_file(file);
                    if let Some(h) = header {
                        response = response.with_header(h);
                    }
                    request.respond(response)
                }
                Err(e) => {
                    log::warn!("Could not open {}: {e}", path.display());
                    request.respond(
                        Response::from_string(pages::error_page(404, "Not found."))
                            .with_status_code(404),
                    )
                }
            },
        };

        if let Err(e) = result {
            log::warn!("Failed to send response: {e}");
        }
    }
}

fn bind(cfg: &ServerConfig) -> Result<Server> {
    let server = match (&cfg.tls_cert, &cfg.tls_key) {
        (Some(cert), Some(key)) => {
            let ssl = SslConfig {
                certificate: fs::read(cert)?,
                private_key: fs::read(key)?,
            };
            Server::https(cfg.listen.as_str(), ssl)
        }
        _ => Server::http(cfg.listen.as_str()),
    };
    server.map_err(|e| anyhow!(e))
}

/// Binds the listener and serves requests on `cfg.workers` threads until
/// the process exits.
pub fn serve(app: App, cfg: &ServerConfig) -> Result<()> {
    let server = Arc::new(bind(cfg)?);
    let scheme = if cfg.tls_cert.is_some() { "https" } else { "http" };
    log::info!("Listening on {scheme}://{} with {} workers", cfg.listen, cfg.workers);

    let app = Arc::new(app);
    let workers: Vec<_> = (0..cfg.workers)
        .map(|_| {
            let server = Arc::clone(&server);
            let app = Arc::clone(&app);
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    app.respond(request);
                }
            })
        })
        .collect();

    for worker in workers {
        if worker.join().is_err() {
            log::error!("Worker thread panicked");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn body_within_limit_is_read() {
        let body = read_body(Cursor::new("EMAIL=a%40b.c&PESQUISA=x"), 64).unwrap();
        assert_eq!(body.as_deref(), Some("EMAIL=a%40b.c&PESQUISA=x"));
    }

    #[test]
    fn body_of_exactly_the_limit_is_accepted() {
        let body = read_body(Cursor::new(vec![b'a'; 16]), 16).unwrap();
        assert_eq!(body.map(|b| b.len()), Some(16));
    }

    #[test]
    fn oversized_body_is_refused() {
        let huge = vec![b'a'; MAX_FORM_BYTES as usize * 4];
        assert_eq!(read_body(Cursor::new(huge), MAX_FORM_BYTES).unwrap(), None);
    }

    #[test]
    fn non_utf8_body_is_an_error() {
        assert!(read_body(Cursor::new(vec![0xff, 0xfe]), 64).is_err());
    }
}
