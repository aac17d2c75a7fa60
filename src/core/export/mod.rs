// src/core/export/mod.rs

//! Rendering of a `ReportDocument` into downloadable formats.
//!
//! Renderers are pure: they map a report to bytes and touch nothing else.
//! Staging the bytes in a temporary file for delivery is done separately by
//! [`StagedExport`], which removes the file when dropped.

pub mod document;
pub mod json;
pub mod markdown;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::core::error::{ReconError, ReconResult};
use crate::core::models::ReportDocument;

/// The export formats a caller may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    Json,
    #[strum(to_string = "markdown", serialize = "md")]
    Markdown,
    #[strum(to_string = "document", serialize = "pdf")]
    Document,
}

impl ExportFormat {
    /// Parses a format selector, rejecting anything unknown as a client error.
    pub fn parse(selector: &str) -> ReconResult<Self> {
        Self::from_str(selector.trim())
            .map_err(|_| ReconError::UnsupportedFormat(selector.to_string()))
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
            Self::Document => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Markdown => "text/markdown",
            Self::Document => "application/pdf",
        }
    }
}

/// `recon_<domain>_<run_id>.<extension>`
pub fn export_filename(doc: &ReportDocument, format: ExportFormat) -> String {
    format!("recon_{}_{}.{}", doc.domain, doc.run_id, format.extension())
}

pub fn content_disposition(filename: &str) -> String {
    format!("attachment; filename={filename}")
}

/// Parses the canonical JSON form of a report.
pub fn parse_report(data: &str) -> ReconResult<ReportDocument> {
    Ok(serde_json::from_str(data)?)
}

/// Renders `doc` in the selected format.
pub fn render(doc: &ReportDocument, format: ExportFormat) -> ReconResult<Vec<u8>> {
    debug!(domain = %doc.domain, run_id = %doc.run_id, %format, "Rendering report.");
    match format {
        ExportFormat::Json => Ok(json::render(doc)?.into_bytes()),
        ExportFormat::Markdown => Ok(markdown::render(doc).into_bytes()),
        ExportFormat::Document => document::render(doc),
    }
}

/// Handles an export request: a previously produced JSON report plus a
/// format selector. The selector is checked before the report is parsed, so
/// an unknown format never reaches a renderer.
///
/// # Arguments
/// * `data` - The canonical JSON form of a report.
/// * `selector` - `json`, `markdown`/`md` or `document`/`pdf`, case-insensitive.
///
/// # Returns
/// The rendered output staged in a temporary file, or `UnsupportedFormat` /
/// `MalformedDocument` for bad input.
pub fn export_report(data: &str, selector: &str) -> ReconResult<StagedExport> {
    let format = ExportFormat::parse(selector)?;
    let doc = parse_report(data)?;
    StagedExport::stage(&doc, format)
}

/// Rendered output waiting in a temporary file for the transport layer.
///
/// The temporary file is deleted when this value is dropped, whether or not
/// delivery succeeded.
#[derive(Debug)]
pub struct StagedExport {
    filename: String,
    format: ExportFormat,
    file: NamedTempFile,
}

impl StagedExport {
    pub fn stage(doc: &ReportDocument, format: ExportFormat) -> ReconResult<Self> {
        let bytes = render(doc, format)?;
        let mut file = NamedTempFile::new()?;
        file.write_all(&bytes)?;
        file.flush()?;
        let filename = export_filename(doc, format);
        debug!(filename = %filename, path = %file.path().display(), "Staged export.");
        Ok(Self { filename, format, file })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn content_disposition(&self) -> String {
        content_disposition(&self.filename)
    }

    /// Location of the staged bytes. Valid only while `self` is alive.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Copies the staged output to `dir/<filename>` and releases the staging file.
    pub fn deliver_to(self, dir: &Path) -> ReconResult<PathBuf> {
        let destination = dir.join(&self.filename);
        std::fs::copy(self.file.path(), &destination)?;
        info!(path = %destination.display(), "Export delivered.");
        Ok(destination)
    }
}

/// `CN=example.com, O=Example Inc` style rendering of a certificate name.
pub(crate) fn format_name(attributes: &BTreeMap<String, String>) -> String {
    if attributes.is_empty() {
        return "N/A".to_string();
    }
    attributes
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn or_na<T: ToString>(value: Option<&T>) -> String {
    value.map_or_else(|| "N/A".to_string(), ToString::to_string)
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_report;
    use super::*;

    #[test]
    fn test_format_selectors() {
        assert_eq!(ExportFormat::parse("json").unwrap(), ExportFormat::Json);
        assert_eq!(ExportFormat::parse("md").unwrap(), ExportFormat::Markdown);
        assert_eq!(ExportFormat::parse("Markdown").unwrap(), ExportFormat::Markdown);
        assert_eq!(ExportFormat::parse("pdf").unwrap(), ExportFormat::Document);
        assert_eq!(ExportFormat::parse("document").unwrap(), ExportFormat::Document);
        assert_eq!(ExportFormat::Markdown.to_string(), "markdown");
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = ExportFormat::parse("xyz").unwrap_err();
        assert!(matches!(err, ReconError::UnsupportedFormat(ref f) if f == "xyz"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unknown_format_rejected_before_parsing_document() {
        // The payload is not even JSON; the format check must win.
        let err = export_report("not json at all", "xyz").unwrap_err();
        assert!(matches!(err, ReconError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_malformed_document_rejected() {
        let err = export_report("{\"domain\": \"example.com\"", "json").unwrap_err();
        assert!(matches!(err, ReconError::MalformedDocument(_)));
    }

    #[test]
    fn test_missing_section_rejected() {
        let err = parse_report(r#"{"domain":"example.com","run_id":"x","timestamp":"t","dns":{"error":"e"},"tls":{"error":"e"}}"#)
            .unwrap_err();
        assert!(matches!(err, ReconError::MalformedDocument(_)));
    }

    fn with_whois_section(section: serde_json::Value) -> String {
        let mut value = serde_json::to_value(sample_report()).unwrap();
        value["whois"] = section;
        value.to_string()
    }

    #[test]
    fn test_non_string_error_section_rejected() {
        let data = with_whois_section(serde_json::json!({ "error": 42 }));
        let err = export_report(&data, "markdown").unwrap_err();
        assert!(matches!(err, ReconError::MalformedDocument(_)));
    }

    #[test]
    fn test_unrecognised_section_rejected() {
        let data = with_whois_section(serde_json::json!({ "garbage": 1 }));
        assert!(matches!(parse_report(&data), Err(ReconError::MalformedDocument(_))));
        let data = with_whois_section(serde_json::json!({}));
        assert!(matches!(parse_report(&data), Err(ReconError::MalformedDocument(_))));
    }

    #[test]
    fn test_filename_convention() {
        let doc = sample_report();
        assert_eq!(export_filename(&doc, ExportFormat::Json), "recon_example.com_1a2b3c4d.json");
        assert_eq!(export_filename(&doc, ExportFormat::Markdown), "recon_example.com_1a2b3c4d.md");
        assert_eq!(export_filename(&doc, ExportFormat::Document), "recon_example.com_1a2b3c4d.pdf");
        assert_eq!(
            content_disposition("recon_example.com_1a2b3c4d.md"),
            "attachment; filename=recon_example.com_1a2b3c4d.md"
        );
    }

    #[test]
    fn test_export_round_trip_through_json() {
        let doc = sample_report();
        let data = json::render(&doc).unwrap();
        let staged = export_report(&data, "md").unwrap();
        assert_eq!(staged.filename(), "recon_example.com_1a2b3c4d.md");
        assert_eq!(staged.content_type(), "text/markdown");
        let body = std::fs::read_to_string(staged.path()).unwrap();
        assert_eq!(body, markdown::render(&doc));
    }

    #[test]
    fn test_staged_file_removed_on_drop() {
        let staged = StagedExport::stage(&sample_report(), ExportFormat::Document).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_deliver_copies_and_cleans_up() {
        let out = tempfile::tempdir().unwrap();
        let staged = StagedExport::stage(&sample_report(), ExportFormat::Json).unwrap();
        let staging_path = staged.path().to_path_buf();
        let delivered = staged.deliver_to(out.path()).unwrap();
        assert_eq!(delivered, out.path().join("recon_example.com_1a2b3c4d.json"));
        assert!(delivered.exists());
        assert!(!staging_path.exists());
    }

    #[test]
    fn test_failed_delivery_still_cleans_up() {
        let staged = StagedExport::stage(&sample_report(), ExportFormat::Json).unwrap();
        let staging_path = staged.path().to_path_buf();
        let missing = std::path::Path::new("/nonexistent/dir/for/delivery");
        assert!(staged.deliver_to(missing).is_err());
        assert!(!staging_path.exists());
    }

    #[test]
    fn test_format_name() {
        let attrs = BTreeMap::from([
            ("CN".to_string(), "example.com".to_string()),
            ("C".to_string(), "US".to_string()),
        ]);
        assert_eq!(format_name(&attrs), "C=US, CN=example.com");
        assert_eq!(format_name(&BTreeMap::new()), "N/A");
    }
}
