// src/core/mod.rs

/// Data structures of the canonical report: `ReportDocument`, `ProbeOutcome`
/// and the per-probe result structs.
pub mod models;

/// The three network probes and the coordinator that runs them together.
pub mod scanner;

/// Rendering of reports into JSON, Markdown and PDF exports.
pub mod export;

pub mod error;

/// Checks applied to user input before a scan is started.
pub mod validation;
