// src/core/models.rs

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString};

// --- Reusable Result Types ---

/// The outcome of a single probe.
///
/// Serialized untagged: a failure is `{"error": "..."}`, a success is the
/// probe's own result object. On the way back in, an `error` key always
/// selects `Failure` and must hold a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProbeOutcome<T> {
    Failure { error: String },
    Success(T),
}

impl<T> ProbeOutcome<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure { error: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn as_success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure { error } => Some(error),
            Self::Success(_) => None,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for ProbeOutcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ProbeOutcome<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if let Some(error) = value.get("error") {
            return match error.as_str() {
                Some(message) => Ok(Self::failure(message)),
                None => Err(D::Error::custom(format!(
                    "section \"error\" must be a string, found {error}"
                ))),
            };
        }
        serde_json::from_value(value)
            .map(Self::Success)
            .map_err(D::Error::custom)
    }
}

// --- Scan Request ---

/// Identity of one scan. Created once at scan start and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub domain: String,
    pub run_id: String,
    pub timestamp: String,
}

impl ScanRequest {
    /// Captures a fresh run id and the current UTC instant for `domain`.
    pub fn new(domain: impl Into<String>) -> Self {
        let mut run_id = uuid::Uuid::new_v4().simple().to_string();
        run_id.truncate(8);
        Self {
            domain: domain.into(),
            run_id,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

// --- DNS Models ---

/// The standard record types queried for every domain, in report order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RecordKind {
    A,
    Aaaa,
    Mx,
    Ns,
    Txt,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsResult {
    #[serde(rename = "A", default)]
    pub a: Vec<String>,
    #[serde(rename = "AAAA", default)]
    pub aaaa: Vec<String>,
    #[serde(rename = "MX", default)]
    pub mx: Vec<String>,
    #[serde(rename = "NS", default)]
    pub ns: Vec<String>,
    #[serde(rename = "TXT", default)]
    pub txt: Vec<String>,
    pub spf_present: bool,
    pub dmarc_present: bool,
    /// Per-record-type lookup failures, keyed by record type name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl DnsResult {
    pub fn records(&self, kind: RecordKind) -> &[String] {
        match kind {
            RecordKind::A => &self.a,
            RecordKind::Aaaa => &self.aaaa,
            RecordKind::Mx => &self.mx,
            RecordKind::Ns => &self.ns,
            RecordKind::Txt => &self.txt,
        }
    }

    pub fn records_mut(&mut self, kind: RecordKind) -> &mut Vec<String> {
        match kind {
            RecordKind::A => &mut self.a,
            RecordKind::Aaaa => &mut self.aaaa,
            RecordKind::Mx => &mut self.mx,
            RecordKind::Ns => &mut self.ns,
            RecordKind::Txt => &mut self.txt,
        }
    }
}

// --- TLS Models ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsResult {
    /// Subject attributes keyed by short name (`CN`, `O`, ...).
    pub subject: BTreeMap<String, String>,
    pub issuer: BTreeMap<String, String>,
    /// X.509 certificate version (3 for v3 certificates).
    pub version: u32,
    pub serial_number: String,
    /// RFC 3339, UTC.
    pub not_before: String,
    /// RFC 3339, UTC.
    pub not_after: String,
    #[serde(default)]
    pub subject_alt_names: Vec<String>,
    pub is_expired: bool,
    pub expiring_soon: bool,
    pub days_to_expire: i64,
}

// --- WHOIS Models ---

/// A registry date field: either one value or several, each already
/// normalized to ISO-8601 (or kept verbatim if it could not be parsed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemporalValue {
    Single(String),
    Multiple(Vec<String>),
}

impl TemporalValue {
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl std::fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.values().join(", "))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhoisResult {
    pub registrar: Option<String>,
    pub creation_date: Option<TemporalValue>,
    pub updated_date: Option<TemporalValue>,
    pub expiration_date: Option<TemporalValue>,
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub status: Vec<String>,
    pub org: Option<String>,
    pub country: Option<String>,
    /// Registry response as received. Always present on a successful lookup.
    pub raw: String,
}

// --- Main Report ---

/// The canonical aggregate of one scan. All three probe slots are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub domain: String,
    pub run_id: String,
    pub timestamp: String,
    pub dns: ProbeOutcome<DnsResult>,
    pub tls: ProbeOutcome<TlsResult>,
    pub whois: ProbeOutcome<WhoisResult>,
}

impl ReportDocument {
    pub fn new(
        request: ScanRequest,
        dns: ProbeOutcome<DnsResult>,
        tls: ProbeOutcome<TlsResult>,
        whois: ProbeOutcome<WhoisResult>,
    ) -> Self {
        let ScanRequest { domain, run_id, timestamp } = request;
        Self { domain, run_id, timestamp, dns, tls, whois }
    }
}
