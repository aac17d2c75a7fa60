// src/lib.rs

//! Passive reconnaissance of a single domain.
//!
//! A scan gathers DNS records, the live TLS certificate and WHOIS registration
//! data concurrently and merges them into one [`ReportDocument`], which can
//! then be exported as JSON, Markdown or PDF.

pub mod config;
pub mod core;
pub mod logging;

pub use crate::config::ScanConfig;
pub use crate::core::error::{ReconError, ReconResult};
pub use crate::core::export::{ExportFormat, StagedExport, export_report, render};
pub use crate::core::models::{ProbeOutcome, ReportDocument};
pub use crate::core::scanner::{ProbeCoordinator, run_full_scan};
pub use crate::core::validation::validate_domain;
