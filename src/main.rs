use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mail_tally::config::{Config, default_config_path, load_config, write_template};
use mail_tally::mail::imap_client::ImapClient;
use mail_tally::pipeline::{self, PipelineSettings};
use mail_tally::web::{App, serve};

#[derive(Parser)]
#[command(name = "mail_tally")]
#[command(about = "Count mailbox messages per day by subject", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the search form
    Serve {
        /// Address to listen on, overriding the config file
        #[arg(long)]
        listen: Option<String>,
    },

    /// Run one search from the terminal (credentials from EMAIL and PASSWORD)
    Report {
        #[arg(long)]
        search: String,

        /// Directory for the chart, overriding the config file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Write a config file with the default settings
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load(cli_path: Option<&PathBuf>) -> Result<Config> {
    load_config(cli_path.map(PathBuf::as_path)).map_err(|e| anyhow!("Configuration error: {e}"))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { listen } => {
            let mut cfg = load(cli.config.as_ref())?;
            if let Some(listen) = listen {
                cfg.server.listen = listen;
            }

            let imap = ImapClient::from_config(&cfg.imap);
            let app = App::new(Box::new(imap), &cfg);
            serve(app, &cfg.server)
        }

        Command::Report { search, out } => {
            let mut cfg = load(cli.config.as_ref())?;
            if let Some(out) = out {
                cfg.chart.static_dir = out;
            }

            let email = std::env::var("EMAIL").ok();
            let password = std::env::var("PASSWORD").ok();
            let imap = ImapClient::from_config(&cfg.imap);
            let report = pipeline::run(
                &imap,
                email.as_deref(),
                password.as_deref(),
                &search,
                &PipelineSettings::from(&cfg),
            )
            .map_err(|e| anyhow!("{e}; set the EMAIL and PASSWORD environment variables"))?;

            for row in &report.rows {
                println!(
                    "{}  {}",
                    row.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    row.record.subject
                );
            }
            println!();
            for (day, n) in &report.counts {
                println!("{day}  {n}");
            }
            if cfg.report.show_dropped_rows {
                for rec in &report.dropped {
                    println!("dropped: {:?} {}", rec.date, rec.subject);
                }
                for diag in &report.diagnostics {
                    println!("skipped: {}", diag.message);
                }
            }
            match &report.chart {
                Some(chart) => println!("Chart written to {}", chart.path.display()),
                None => println!("No data to plot"),
            }
            Ok(())
        }

        Command::InitConfig { force } => {
            let path = match cli.config {
                Some(p) => p,
                None => default_config_path()?,
            };
            if path.exists() && !force {
                return Err(anyhow!(
                    "{} already exists (use --force to replace it)",
                    path.display()
                ));
            }
            write_template(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}
