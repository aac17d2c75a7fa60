// src/core/scanner/whois_scanner.rs

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};
use whois_rust::{WhoIs, WhoIsLookupOptions};

use super::Probe;
use crate::core::models::{ProbeOutcome, TemporalValue, WhoisResult};

const WHOIS_SERVERS: &str = include_str!("whois_servers.json");

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y.%m.%d %H:%M:%S",
    "%d-%b-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%d-%b-%Y", "%d.%m.%Y"];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

static REGISTRAR: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Registrar:[ \t]*(.+)$",
        r"(?im)^\s*Registrar Name:[ \t]*(.+)$",
        r"(?im)^\s*Sponsoring Registrar:[ \t]*(.+)$",
    ])
});

static CREATION_DATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Creation Date:[ \t]*(.+)$",
        r"(?im)^\s*Created Date:[ \t]*(.+)$",
        r"(?im)^\s*Created:[ \t]*(.+)$",
        r"(?im)^\s*Registration Time:[ \t]*(.+)$",
        r"(?im)^\s*Registration Date:[ \t]*(.+)$",
    ])
});

static UPDATED_DATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Updated Date:[ \t]*(.+)$",
        r"(?im)^\s*Last Updated:[ \t]*(.+)$",
        r"(?im)^\s*Last Modified:[ \t]*(.+)$",
        r"(?im)^\s*Changed:[ \t]*(.+)$",
    ])
});

static EXPIRATION_DATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Registry Expiry Date:[ \t]*(.+)$",
        r"(?im)^\s*Registrar Registration Expiration Date:[ \t]*(.+)$",
        r"(?im)^\s*Expir(?:y|ation) Date:[ \t]*(.+)$",
        r"(?im)^\s*Expiration Time:[ \t]*(.+)$",
        r"(?im)^\s*paid-till:[ \t]*(.+)$",
    ])
});

static NAME_SERVERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Name Server:[ \t]*(\S+)",
        r"(?im)^\s*nserver:[ \t]*(\S+)",
    ])
});

static STATUS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Domain Status:[ \t]*(\S+)",
        r"(?im)^\s*Status:[ \t]*(\S+)",
        r"(?im)^\s*state:[ \t]*(\S+)",
    ])
});

static ORGANIZATION: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Registrant Organi[sz]ation:[ \t]*(.+)$",
        r"(?im)^\s*org:[ \t]*(.+)$",
        r"(?im)^\s*Organi[sz]ation:[ \t]*(.+)$",
    ])
});

static COUNTRY: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?im)^\s*Registrant Country:[ \t]*(.+)$",
        r"(?im)^\s*country:[ \t]*(.+)$",
    ])
});

/// Queries registration data for a domain from its registry's WHOIS server.
#[derive(Debug, Clone)]
pub struct WhoisProbe {
    timeout: Duration,
}

impl WhoisProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Queries the registry's WHOIS server and extracts the registration fields.
    ///
    /// # Arguments
    /// * `domain` - A validated domain name.
    ///
    /// # Returns
    /// `ProbeOutcome::Success` with the parsed fields and the raw response.
    /// A timeout or a response with no recognisable fields is a failure.
    pub async fn lookup(&self, domain: &str) -> ProbeOutcome<WhoisResult> {
        info!(target = %domain, "Starting WHOIS lookup.");
        let outcome: ProbeOutcome<WhoisResult> = self.query(domain).await.into();
        match outcome.error() {
            None => info!(target = %domain, "WHOIS lookup finished."),
            Some(message) => warn!(target = %domain, error = %message, "WHOIS lookup failed."),
        }
        outcome
    }

    async fn query(&self, domain: &str) -> Result<WhoisResult, String> {
        let whois = WhoIs::from_string(WHOIS_SERVERS)
            .map_err(|e| format!("Failed to initialize WHOIS client: {e}"))?;
        let options = WhoIsLookupOptions::from_string(domain)
            .map_err(|e| format!("Invalid domain: {e}"))?;

        let raw = tokio::time::timeout(self.timeout, whois.lookup_async(options))
            .await
            .map_err(|_| format!("WHOIS query timed out after {}s", self.timeout.as_secs_f32()))?
            .map_err(|e| format!("WHOIS query failed: {e}"))?;
        debug!(target = %domain, bytes = raw.len(), "Received WHOIS response.");

        parse_whois_response(&raw).ok_or_else(|| format!("No WHOIS data found for {domain}"))
    }
}

impl Probe for WhoisProbe {
    type Output = WhoisResult;

    fn name(&self) -> &'static str {
        "WHOIS"
    }

    async fn run(&self, domain: &str) -> ProbeOutcome<WhoisResult> {
        self.lookup(domain).await
    }
}

/// Extracts registration fields from raw registry text.
///
/// Returns `None` when nothing recognisable is present, which is how
/// registries answer for unregistered or unknown names.
pub fn parse_whois_response(raw: &str) -> Option<WhoisResult> {
    let result = WhoisResult {
        registrar: first_match(raw, &REGISTRAR),
        creation_date: normalize_temporal(all_matches(raw, &CREATION_DATE)),
        updated_date: normalize_temporal(all_matches(raw, &UPDATED_DATE)),
        expiration_date: normalize_temporal(all_matches(raw, &EXPIRATION_DATE)),
        name_servers: dedup(
            all_matches(raw, &NAME_SERVERS)
                .into_iter()
                .map(|s| s.trim_end_matches('.').to_lowercase())
                .collect(),
        ),
        status: dedup(all_matches(raw, &STATUS)),
        org: first_match(raw, &ORGANIZATION),
        country: first_match(raw, &COUNTRY),
        raw: raw.to_string(),
    };

    let has_data = result.registrar.is_some()
        || result.creation_date.is_some()
        || result.expiration_date.is_some()
        || !result.name_servers.is_empty();
    has_data.then_some(result)
}

/// Try each pattern in order and return the first non-empty capture.
fn first_match(text: &str, patterns: &[Regex]) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .find(|value| !value.is_empty())
    })
}

/// Every non-empty capture of every pattern, in pattern then text order.
fn all_matches(text: &str, patterns: &[Regex]) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

/// Normalizes the raw values of one date field.
///
/// No values gives `None`, one distinct value gives `Single`, several give
/// `Multiple` in their original order.
pub fn normalize_temporal(values: Vec<String>) -> Option<TemporalValue> {
    let mut normalized = dedup(values.iter().map(|v| normalize_date(v)).collect());
    match normalized.len() {
        0 => None,
        1 => normalized.pop().map(TemporalValue::Single),
        _ => Some(TemporalValue::Multiple(normalized)),
    }
}

/// Converts one registry date to ISO-8601, or returns it trimmed but
/// otherwise unchanged if no known format matches.
pub fn normalize_date(raw: &str) -> String {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return dt.to_rfc3339_opts(SecondsFormat::AutoSi, true);
    }

    let naive = value
        .trim_end_matches(" UTC")
        .trim_end_matches(" GMT")
        .trim_end_matches('Z')
        .trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return dt.format("%Y-%m-%dT%H:%M:%S").to_string();
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(naive, format) {
            return format!("{}T00:00:00", date.format("%Y-%m-%d"));
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERISIGN: &str = "   Domain Name: EXAMPLE.COM
   Registry Domain ID: 2336799_DOMAIN_COM-VRSN
   Registrar WHOIS Server: whois.iana.org
   Updated Date: 2024-08-14T07:01:34Z
   Creation Date: 1995-08-14T04:00:00Z
   Registry Expiry Date: 2025-08-13T04:00:00Z
   Registrar: RESERVED-Internet Assigned Numbers Authority
   Domain Status: clientDeleteProhibited https://icann.org/epp#clientDeleteProhibited
   Domain Status: clientTransferProhibited https://icann.org/epp#clientTransferProhibited
   Name Server: A.IANA-SERVERS.NET
   Name Server: B.IANA-SERVERS.NET
";

    #[test]
    fn test_parse_verisign_response() {
        let result = parse_whois_response(VERISIGN).unwrap();
        assert_eq!(
            result.registrar.as_deref(),
            Some("RESERVED-Internet Assigned Numbers Authority")
        );
        assert_eq!(
            result.creation_date,
            Some(TemporalValue::Single("1995-08-14T04:00:00Z".to_string()))
        );
        assert_eq!(
            result.expiration_date,
            Some(TemporalValue::Single("2025-08-13T04:00:00Z".to_string()))
        );
        assert_eq!(result.name_servers, vec!["a.iana-servers.net", "b.iana-servers.net"]);
        assert_eq!(result.status, vec!["clientDeleteProhibited", "clientTransferProhibited"]);
        assert_eq!(result.raw, VERISIGN);
    }

    #[test]
    fn test_two_creation_dates_become_sequence() {
        let raw = "Registrar: Example Registrar, Inc.
Creation Date: 1997-09-15T04:00:00Z
Creation Date: 1997-09-15 07:00:00
";
        let result = parse_whois_response(raw).unwrap();
        assert_eq!(
            result.creation_date,
            Some(TemporalValue::Multiple(vec![
                "1997-09-15T04:00:00Z".to_string(),
                "1997-09-15T07:00:00".to_string(),
            ]))
        );
    }

    #[test]
    fn test_repeated_identical_dates_collapse() {
        let values = vec!["2020-01-01".to_string(), "2020-01-01".to_string()];
        assert_eq!(
            normalize_temporal(values),
            Some(TemporalValue::Single("2020-01-01T00:00:00".to_string()))
        );
    }

    #[test]
    fn test_ru_format() {
        let raw = "nserver: ns1.example.ru.
nserver: ns2.example.ru.
state: REGISTERED, DELEGATED
org: Example LLC
paid-till: 2025-12-01T00:00:00Z
created: 2000-01-01T00:00:00Z
";
        let result = parse_whois_response(raw).unwrap();
        assert_eq!(result.name_servers, vec!["ns1.example.ru", "ns2.example.ru"]);
        assert_eq!(result.org.as_deref(), Some("Example LLC"));
        assert_eq!(result.status, vec!["REGISTERED,"]);
        assert!(result.creation_date.is_some());
        assert!(result.expiration_date.is_some());
    }

    #[test]
    fn test_org_and_country() {
        let raw = "Registrar: R
Registrant Organization: Example Org
Registrant Country: US
";
        let result = parse_whois_response(raw).unwrap();
        assert_eq!(result.org.as_deref(), Some("Example Org"));
        assert_eq!(result.country.as_deref(), Some("US"));
    }

    #[test]
    fn test_no_match_is_none() {
        assert!(parse_whois_response("No match for \"NOPE-NOT-REAL.COM\".\r\n").is_none());
        assert!(parse_whois_response("").is_none());
    }

    #[test]
    fn test_normalize_date_formats() {
        assert_eq!(normalize_date("2003-03-17 12:20:05"), "2003-03-17T12:20:05");
        assert_eq!(normalize_date("2023-08-14 07:01:44 UTC"), "2023-08-14T07:01:44");
        assert_eq!(normalize_date("14-aug-1995"), "1995-08-14T00:00:00");
        assert_eq!(normalize_date("2001.05.02"), "2001-05-02T00:00:00");
        assert_eq!(normalize_date(" 2024-01-01T00:00:00+02:00 "), "2024-01-01T00:00:00+02:00");
    }

    #[test]
    fn test_unparseable_date_kept_verbatim() {
        assert_eq!(normalize_date("before 1995"), "before 1995");
        assert_eq!(
            normalize_temporal(vec!["before 1995".to_string()]),
            Some(TemporalValue::Single("before 1995".to_string()))
        );
    }

    #[test]
    fn test_no_values_is_none() {
        assert_eq!(normalize_temporal(Vec::new()), None);
    }

    #[test]
    fn test_servers_map_loads() {
        assert!(WhoIs::from_string(WHOIS_SERVERS).is_ok());
    }

    #[tokio::test]
    #[ignore]
    async fn test_lookup_real() {
        let outcome = WhoisProbe::new(Duration::from_secs(15)).lookup("example.com").await;
        let whois = outcome.as_success().expect("registry answered");
        assert!(whois.registrar.is_some());
    }
}
