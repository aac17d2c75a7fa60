// src/core/error.rs

use thiserror::Error;

/// Errors surfaced to callers of the library.
///
/// Probe failures are not represented here; they live inside the report as
/// `ProbeOutcome::Failure`.
#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Invalid domain format: {0}. Please enter a domain name only (e.g. example.com).")]
    InvalidDomain(String),

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed report document: {0}")]
    MalformedDocument(#[from] serde_json::Error),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReconError {
    /// True for errors caused by caller input rather than by the environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDomain(_) | Self::UnsupportedFormat(_) | Self::MalformedDocument(_)
        )
    }
}

pub type ReconResult<T> = std::result::Result<T, ReconError>;
