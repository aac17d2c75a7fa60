// src/core/export/json.rs

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::core::error::{ReconError, ReconResult};
use crate::core::models::ReportDocument;

/// Serializes the report with four-space indentation.
pub fn render(doc: &ReportDocument) -> ReconResult<String> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    doc.serialize(&mut serializer)
        .map_err(|e| ReconError::Render(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| ReconError::Render(e.to_string()))
}
