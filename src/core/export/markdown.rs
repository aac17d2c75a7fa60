// src/core/export/markdown.rs

use std::fmt::Write;

use strum::IntoEnumIterator;

use super::{format_name, or_na};
use crate::core::models::{DnsResult, ProbeOutcome, RecordKind, ReportDocument, TlsResult, WhoisResult};

/// Renders the report as Markdown.
///
/// Sections always appear in the same order; a failed probe's section holds
/// only its error message.
pub fn render(doc: &ReportDocument) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Recon Report: {}", doc.domain);
    let _ = writeln!(md, "**Timestamp:** {}  ", doc.timestamp);
    let _ = writeln!(md, "**Run ID:** {}", doc.run_id);

    md.push_str("\n## DNS Results\n");
    section(&mut md, &doc.dns, dns_body);
    md.push_str("\n## TLS Certificate\n");
    section(&mut md, &doc.tls, tls_body);
    md.push_str("\n## WHOIS Info\n");
    section(&mut md, &doc.whois, whois_body);
    md
}

fn section<T>(md: &mut String, outcome: &ProbeOutcome<T>, body: fn(&mut String, &T)) {
    match outcome {
        ProbeOutcome::Success(value) => body(md, value),
        ProbeOutcome::Failure { error } => {
            let _ = writeln!(md, "Error: {error}");
        }
    }
}

fn dns_body(md: &mut String, dns: &DnsResult) {
    for kind in RecordKind::iter() {
        let records = dns.records(kind);
        if records.is_empty() {
            continue;
        }
        let _ = writeln!(md, "### {kind}");
        for record in records {
            let _ = writeln!(md, "- {record}");
        }
    }
    if !dns.errors.is_empty() {
        md.push_str("### Lookup Errors\n");
        for (record_type, error) in &dns.errors {
            let _ = writeln!(md, "- {record_type}: {error}");
        }
    }
    let _ = writeln!(md, "\n**SPF Present:** {}  ", dns.spf_present);
    let _ = writeln!(md, "**DMARC Present:** {}", dns.dmarc_present);
}

fn tls_body(md: &mut String, tls: &TlsResult) {
    let _ = writeln!(md, "- **Subject:** {}", format_name(&tls.subject));
    let _ = writeln!(md, "- **Issuer:** {}", format_name(&tls.issuer));
    let _ = writeln!(md, "- **Serial Number:** {}", tls.serial_number);
    let _ = writeln!(md, "- **Valid From:** {}", tls.not_before);
    let _ = writeln!(md, "- **Valid To:** {}", tls.not_after);
    let _ = writeln!(md, "- **Days to Expire:** {}", tls.days_to_expire);
    let _ = writeln!(md, "- **Expired:** {}", tls.is_expired);
    let _ = writeln!(md, "- **Expiring Soon:** {}", tls.expiring_soon);
    if !tls.subject_alt_names.is_empty() {
        let _ = writeln!(md, "- **Alternative Names:** {}", tls.subject_alt_names.join(", "));
    }
}

fn whois_body(md: &mut String, whois: &WhoisResult) {
    let _ = writeln!(md, "- **Registrar:** {}", or_na(whois.registrar.as_ref()));
    let _ = writeln!(md, "- **Creation Date:** {}", or_na(whois.creation_date.as_ref()));
    let _ = writeln!(md, "- **Updated Date:** {}", or_na(whois.updated_date.as_ref()));
    let _ = writeln!(md, "- **Expiration Date:** {}", or_na(whois.expiration_date.as_ref()));
    let _ = writeln!(md, "- **Organization:** {}", or_na(whois.org.as_ref()));
    let _ = writeln!(md, "- **Country:** {}", or_na(whois.country.as_ref()));
    if !whois.name_servers.is_empty() {
        let _ = writeln!(md, "- **Name Servers:** {}", whois.name_servers.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::fixtures::{failed_report, sample_report};

    #[test]
    fn test_header() {
        let md = render(&sample_report());
        assert!(md.starts_with(
            "# Recon Report: example.com\n**Timestamp:** 2025-06-01T12:00:00Z  \n**Run ID:** 1a2b3c4d\n"
        ));
    }

    #[test]
    fn test_section_order() {
        let md = render(&sample_report());
        let dns = md.find("## DNS Results").unwrap();
        let tls = md.find("## TLS Certificate").unwrap();
        let whois = md.find("## WHOIS Info").unwrap();
        assert!(dns < tls && tls < whois);
    }

    #[test]
    fn test_dns_section() {
        let md = render(&sample_report());
        assert!(md.contains("### A\n- 93.184.216.34\n"));
        assert!(md.contains("### TXT\n- v=spf1 -all\n- _dmarc: v=DMARC1;p=reject\n"));
        assert!(!md.contains("### AAAA"));
        assert!(md.contains("### Lookup Errors\n- AAAA: proto error: truncated\n"));
        assert!(md.contains("**SPF Present:** true"));
        assert!(md.contains("**DMARC Present:** true"));
    }

    #[test]
    fn test_tls_section() {
        let md = render(&sample_report());
        assert!(md.contains("- **Subject:** CN=www.example.org, O=Internet Corporation"));
        assert!(md.contains("- **Valid To:** 2026-01-15T23:59:59Z\n"));
        assert!(md.contains("- **Expiring Soon:** false\n"));
    }

    #[test]
    fn test_whois_section() {
        let md = render(&sample_report());
        assert!(md.contains("- **Registrar:** RESERVED-Internet Assigned Numbers Authority\n"));
        assert!(md.contains("- **Expiration Date:** 2025-08-13T04:00:00Z, 2026-08-13T04:00:00Z\n"));
        assert!(md.contains("- **Organization:** N/A\n"));
        assert!(md.contains("- **Country:** US\n"));
    }

    #[test]
    fn test_failures_replace_bodies() {
        let md = render(&failed_report());
        assert!(md.contains("## DNS Results\nError: No usable resolver configuration\n"));
        assert!(md.contains("## TLS Certificate\nError: TLS Handshake Error: unexpected EOF\n"));
        assert!(md.contains("## WHOIS Info\nError: WHOIS query timed out after 15s\n"));
        assert!(!md.contains("SPF Present"));
        assert!(!md.contains("Registrar"));
    }
}
