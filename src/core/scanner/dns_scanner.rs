// src/core/scanner/dns_scanner.rs

use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::error::ProtoErrorKind;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::system_conf::read_system_conf;
use tracing::{debug, info, warn};

use super::Probe;
use crate::core::models::{DnsResult, ProbeOutcome, RecordKind};

const SPF_MARKER: &str = "v=spf1";
const DMARC_MARKER: &str = "v=DMARC1";
const DMARC_PREFIX: &str = "_dmarc:";
/// Error key used when the dedicated `_dmarc` lookup fails unexpectedly.
pub const DMARC_ERROR_KEY: &str = "_dmarc";

/// The result of one record-type query.
///
/// Absence (no records, NXDOMAIN, no reachable nameserver, timeout) is a
/// normal answer and is kept apart from failures that deserve reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Records(Vec<String>),
    Absent,
    Failed(String),
}

/// Resolves the standard record types for a domain and derives SPF/DMARC presence.
#[derive(Debug, Clone)]
pub struct DnsProbe {
    timeout: Duration,
}

impl DnsProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Builds a resolver from the system configuration with this probe's
    /// per-query timeout. Fails only when no resolver can be configured.
    fn build_resolver(&self) -> Result<TokioAsyncResolver, String> {
        let (config, mut opts) = read_system_conf().map_err(|e| {
            warn!(error = %e, "Could not read system resolver configuration.");
            format!("No usable resolver configuration: {e}")
        })?;
        opts.timeout = self.timeout;
        Ok(TokioAsyncResolver::tokio(config, opts))
    }

    /// Performs the A, AAAA, MX, NS and TXT lookups for a domain, plus the
    /// TXT lookup at `_dmarc.<domain>`, all concurrently.
    ///
    /// Records that simply do not exist leave their list empty. Any other
    /// per-type error is kept in `DnsResult::errors` while the remaining
    /// types are still reported.
    ///
    /// # Arguments
    /// * `domain` - A validated domain name.
    ///
    /// # Returns
    /// `ProbeOutcome::Success` with the merged records and SPF/DMARC flags, or
    /// a failure when no resolver could be configured at all.
    pub async fn resolve(&self, domain: &str) -> ProbeOutcome<DnsResult> {
        info!(target = %domain, "Starting DNS scan.");

        let resolver = match self.build_resolver() {
            Ok(resolver) => resolver,
            Err(message) => return ProbeOutcome::failure(message),
        };

        let dmarc_target = format!("_dmarc.{domain}");
        let (a, aaaa, mx, ns, txt, dmarc) = tokio::join!(
            lookup(&resolver, domain, RecordKind::A),
            lookup(&resolver, domain, RecordKind::Aaaa),
            lookup(&resolver, domain, RecordKind::Mx),
            lookup(&resolver, domain, RecordKind::Ns),
            lookup(&resolver, domain, RecordKind::Txt),
            lookup(&resolver, &dmarc_target, RecordKind::Txt)
        );

        let results = assemble(
            vec![
                (RecordKind::A, a),
                (RecordKind::Aaaa, aaaa),
                (RecordKind::Mx, mx),
                (RecordKind::Ns, ns),
                (RecordKind::Txt, txt),
            ],
            dmarc,
        );
        info!(
            spf = results.spf_present,
            dmarc = results.dmarc_present,
            errors = results.errors.len(),
            "DNS scan finished."
        );
        ProbeOutcome::Success(results)
    }
}

impl Probe for DnsProbe {
    type Output = DnsResult;

    fn name(&self) -> &'static str {
        "DNS"
    }

    async fn run(&self, domain: &str) -> ProbeOutcome<DnsResult> {
        self.resolve(domain).await
    }
}

fn record_type(kind: RecordKind) -> RecordType {
    match kind {
        RecordKind::A => RecordType::A,
        RecordKind::Aaaa => RecordType::AAAA,
        RecordKind::Mx => RecordType::MX,
        RecordKind::Ns => RecordType::NS,
        RecordKind::Txt => RecordType::TXT,
    }
}

async fn lookup(resolver: &TokioAsyncResolver, name: &str, kind: RecordKind) -> LookupOutcome {
    debug!(target = name, record_type = %kind, "Looking up records.");
    match resolver.lookup(name, record_type(kind)).await {
        Ok(answer) => {
            let records: Vec<String> = answer.iter().map(|rdata| rdata.to_string()).collect();
            debug!(target = name, record_type = %kind, count = records.len(), "Lookup answered.");
            if records.is_empty() {
                LookupOutcome::Absent
            } else {
                LookupOutcome::Records(records)
            }
        }
        Err(e) => {
            let outcome = classify_error(&e);
            if let LookupOutcome::Failed(message) = &outcome {
                warn!(target = name, record_type = %kind, error = %message, "Lookup failed.");
            }
            outcome
        }
    }
}

/// Sorts a resolver error into benign absence or a reportable failure.
pub fn classify_error(error: &ResolveError) -> LookupOutcome {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { .. }
        | ResolveErrorKind::NoConnections
        | ResolveErrorKind::Timeout => LookupOutcome::Absent,
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => {
            LookupOutcome::Absent
        }
        ResolveErrorKind::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            LookupOutcome::Absent
        }
        _ => LookupOutcome::Failed(error.to_string()),
    }
}

/// Merges the per-type outcomes and the `_dmarc` lookup into one `DnsResult`.
pub fn assemble(standard: Vec<(RecordKind, LookupOutcome)>, dmarc: LookupOutcome) -> DnsResult {
    let mut results = DnsResult::default();

    for (kind, outcome) in standard {
        match outcome {
            LookupOutcome::Records(records) => results.records_mut(kind).extend(records),
            LookupOutcome::Absent => {}
            LookupOutcome::Failed(message) => {
                results.errors.insert(kind.to_string(), message);
            }
        }
    }

    results.spf_present = results.txt.iter().any(|r| r.contains(SPF_MARKER));
    results.dmarc_present = results.txt.iter().any(|r| r.contains(DMARC_MARKER));

    match dmarc {
        LookupOutcome::Records(records) => {
            for record in records {
                if record.contains(DMARC_MARKER) {
                    results.dmarc_present = true;
                }
                results.txt.push(format!("{DMARC_PREFIX} {record}"));
            }
        }
        LookupOutcome::Absent => {}
        LookupOutcome::Failed(message) => {
            results.errors.insert(DMARC_ERROR_KEY.to_string(), message);
        }
    }

    results
}
