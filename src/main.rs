// src/main.rs

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;

use vanguard_recon::config::{ScanConfig, load_settings, settings_path};
use vanguard_recon::core::export::{self, ExportFormat, StagedExport};
use vanguard_recon::core::scanner::run_full_scan;
use vanguard_recon::core::validation::validate_domain;
use vanguard_recon::logging;

#[derive(Parser, Debug)]
#[command(version, about = "Passive DNS, TLS and WHOIS reconnaissance for a single domain")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a domain and print the report as JSON, or write it as an export file.
    Scan {
        /// Domain name only, e.g. example.com
        domain: String,

        /// Write an export in this format (json, markdown, document) instead of printing JSON.
        #[arg(short = 'f', long = "format")]
        format: Option<String>,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        timeouts: TimeoutArgs,
    },
    /// Render a previously saved JSON report without scanning again.
    Export {
        /// Path to a report produced by `scan`.
        report: PathBuf,

        #[arg(short = 'f', long = "format")]
        format: String,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Directory the export file is written to.
    #[arg(short = 'o', long = "output", default_value = ".")]
    dir: PathBuf,
}

#[derive(Args, Debug)]
struct TimeoutArgs {
    /// Per-query DNS timeout in seconds.
    #[arg(long = "dns-timeout")]
    dns: Option<u64>,

    /// TLS connect and handshake timeout in seconds.
    #[arg(long = "tls-timeout")]
    tls: Option<u64>,

    /// WHOIS query timeout in seconds.
    #[arg(long = "whois-timeout")]
    whois: Option<u64>,

    /// Upper bound for each probe in seconds.
    #[arg(long = "deadline")]
    deadline: Option<u64>,
}

impl TimeoutArgs {
    fn apply(&self, config: &mut ScanConfig) {
        if let Some(secs) = self.dns {
            config.dns_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.tls {
            config.tls_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.whois {
            config.whois_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.deadline {
            config.scan_deadline = Duration::from_secs(secs);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let log_path = logging::initialize_logging()?;
    let cli = Cli::parse();
    info!(log = %log_path.display(), "vanguard-recon started.");

    match cli.command {
        Command::Scan { domain, format, output, timeouts } => {
            let mut config = ScanConfig::default();
            load_settings(&settings_path()).apply(&mut config);
            timeouts.apply(&mut config);

            // Reject bad input before any probe is dispatched.
            let domain = validate_domain(&domain)?;
            let format = format.as_deref().map(ExportFormat::parse).transpose()?;

            let report = run_full_scan(&domain, &config).await;
            match format {
                Some(format) => {
                    let staged = StagedExport::stage(&report, format)?;
                    let path = staged.deliver_to(&output.dir)?;
                    println!("{}", path.display());
                }
                None => println!("{}", export::json::render(&report)?),
            }
        }
        Command::Export { report, format, output } => {
            let data = std::fs::read_to_string(&report)
                .wrap_err_with(|| format!("Could not read report {}", report.display()))?;
            let staged = export::export_report(&data, &format)?;
            let path = staged.deliver_to(&output.dir)?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
