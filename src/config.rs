use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub imap: ImapConfig,
    pub server: ServerConfig,
    pub chart: ChartConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ImapConfig {
    pub server: String,
    pub port: u16,
    pub mailbox: String,
    /// Socket read timeout in seconds; 0 waits forever.
    pub read_timeout_secs: u64,
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            server: "imap.gmail.com".to_string(),
            port: 993,
            mailbox: "INBOX".to_string(),
            read_timeout_secs: 30,
        }
    }
}

impl ImapConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }
}

/// Web server settings. Built once and handed to the server bootstrap.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub workers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_cert: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_key: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            workers: 4,
            tls_cert: None,
            tls_key: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    pub static_dir: PathBuf,
    /// Give every rendered chart its own file name instead of overwriting `plot.svg`.
    pub unique_names: bool,
    pub width: u32,
    pub height: u32,
    /// With `unique_names`, older charts beyond this many are deleted.
    pub keep_charts: usize,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("static"),
            unique_names: true,
            width: 1000,
            height: 600,
            keep_charts: 50,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// List rows with unparseable dates and skipped messages on the results page.
    pub show_dropped_rows: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.imap.server.trim().is_empty() {
            return Err(invalid("imap.server", "must not be empty"));
        }
        if self.imap.port == 0 {
            return Err(invalid("imap.port", "must be non-zero"));
        }
        if self.imap.mailbox.trim().is_empty() {
            return Err(invalid("imap.mailbox", "must not be empty"));
        }
        if self.server.workers == 0 {
            return Err(invalid("server.workers", "must be at least 1"));
        }
        if self.server.tls_cert.is_some() != self.server.tls_key.is_some() {
            return Err(invalid(
                "server.tls_cert",
                "tls_cert and tls_key must be set together",
            ));
        }
        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(invalid("chart.width", "chart dimensions must be non-zero"));
        }
        if self.chart.keep_charts == 0 {
            return Err(invalid("chart.keep_charts", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        message: message.to_string(),
    }
}

fn config_dir() -> Result<PathBuf, ConfigError> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join("mail_tally"))
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Writes the default configuration to `path`, creating parent directories.
pub fn write_template(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tom = toml::to_string_pretty(&Config::default())?;
    fs::write(path, tom)?;
    Ok(())
}

/// Loads the configuration.
///
/// An explicit path must exist. Without one the default location is used,
/// and a template is written there on first run.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = default_config_path()?;
            if !p.exists() {
                write_template(&p)?;
                log::info!("Created template config at {}", p.display());
            }
            p
        }
    };

    let s = fs::read_to_string(&path)?;
    let cfg: Config = toml::from_str(&s)?;
    cfg.validate()?;
    log::debug!("Loaded config from {}", path.display());
    Ok(cfg)
}
