// src/core/scanner/mod.rs

pub mod dns_scanner;
pub mod ssl_scanner;
pub mod whois_scanner;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ScanConfig;
use crate::core::models::{
    DnsResult, ProbeOutcome, ReportDocument, ScanRequest, TlsResult, WhoisResult,
};
use self::dns_scanner::DnsProbe;
use self::ssl_scanner::TlsProbe;
use self::whois_scanner::WhoisProbe;

/// One independent reconnaissance probe against a single domain.
///
/// Implementations must turn every failure into `ProbeOutcome::Failure`;
/// a probe never returns an error across this boundary.
pub trait Probe: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Short name used in logs and in deadline messages.
    fn name(&self) -> &'static str;

    fn run(&self, domain: &str) -> impl Future<Output = ProbeOutcome<Self::Output>> + Send;
}

/// Runs the DNS, TLS and WHOIS probes concurrently and merges their outcomes.
pub struct ProbeCoordinator<D, T, W> {
    dns: Arc<D>,
    tls: Arc<T>,
    whois: Arc<W>,
    deadline: Duration,
}

impl ProbeCoordinator<DnsProbe, TlsProbe, WhoisProbe> {
    /// The coordinator wired to the live network probes.
    pub fn live(config: &ScanConfig) -> Self {
        Self::new(
            DnsProbe::new(config.dns_timeout),
            TlsProbe::new(config.tls_port, config.tls_timeout),
            WhoisProbe::new(config.whois_timeout),
            config.scan_deadline,
        )
    }
}

impl<D, T, W> ProbeCoordinator<D, T, W>
where
    D: Probe<Output = DnsResult>,
    T: Probe<Output = TlsResult>,
    W: Probe<Output = WhoisResult>,
{
    pub fn new(dns: D, tls: T, whois: W, deadline: Duration) -> Self {
        Self {
            dns: Arc::new(dns),
            tls: Arc::new(tls),
            whois: Arc::new(whois),
            deadline,
        }
    }

    /// Scans `domain`, which is expected to have been validated already.
    ///
    /// Waits for all three probes. Each probe runs as its own task under the
    /// coordinator deadline, so a slow, failing or panicking probe only ever
    /// affects its own slot of the report.
    pub async fn scan(&self, domain: &str) -> ReportDocument {
        let request = ScanRequest::new(domain);
        info!(target = %request.domain, run_id = %request.run_id, "Starting full scan.");

        let dns_task = spawn_probe(Arc::clone(&self.dns), &request.domain, self.deadline);
        let tls_task = spawn_probe(Arc::clone(&self.tls), &request.domain, self.deadline);
        let whois_task = spawn_probe(Arc::clone(&self.whois), &request.domain, self.deadline);

        // Barrier: nothing is merged until every probe has finished.
        let (dns, tls, whois) = tokio::join!(
            join_probe(self.dns.name(), dns_task),
            join_probe(self.tls.name(), tls_task),
            join_probe(self.whois.name(), whois_task)
        );

        info!(
            run_id = %request.run_id,
            dns_ok = dns.is_success(),
            tls_ok = tls.is_success(),
            whois_ok = whois.is_success(),
            "Full scan finished."
        );
        ReportDocument::new(request, dns, tls, whois)
    }
}

fn spawn_probe<P: Probe>(
    probe: Arc<P>,
    domain: &str,
    deadline: Duration,
) -> JoinHandle<ProbeOutcome<P::Output>> {
    let domain = domain.to_string();
    tokio::spawn(async move {
        match tokio::time::timeout(deadline, probe.run(&domain)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(probe = probe.name(), target = %domain, "Probe exceeded the scan deadline.");
                ProbeOutcome::failure(format!(
                    "{} probe timed out after {}s",
                    probe.name(),
                    deadline.as_secs_f32()
                ))
            }
        }
    })
}

async fn join_probe<T>(name: &'static str, task: JoinHandle<ProbeOutcome<T>>) -> ProbeOutcome<T> {
    task.await.unwrap_or_else(|e| {
        error!(probe = name, panic = %e, "Probe task panicked!");
        ProbeOutcome::failure(format!("{name} probe task panicked: {e}"))
    })
}

/// Orchestrates a full scan of a domain with the live DNS, TLS and WHOIS probes.
///
/// # Arguments
/// * `domain` - A domain name that has already passed `validate_domain`.
/// * `config` - Timeouts, TLS port and per-probe deadline for this scan.
///
/// # Returns
/// A `ReportDocument` whose three sections are always populated, each with
/// either the probe's result or the error that stopped it.
pub async fn run_full_scan(domain: &str, config: &ScanConfig) -> ReportDocument {
    ProbeCoordinator::live(config).scan(domain).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct StubDns {
        delay: Duration,
    }

    impl Probe for StubDns {
        type Output = DnsResult;

        fn name(&self) -> &'static str {
            "DNS"
        }

        async fn run(&self, _domain: &str) -> ProbeOutcome<DnsResult> {
            tokio::time::sleep(self.delay).await;
            ProbeOutcome::Success(DnsResult {
                a: vec!["93.184.216.34".to_string()],
                ..Default::default()
            })
        }
    }

    struct StubTls {
        delay: Duration,
        fail: bool,
    }

    impl Probe for StubTls {
        type Output = TlsResult;

        fn name(&self) -> &'static str {
            "TLS"
        }

        async fn run(&self, _domain: &str) -> ProbeOutcome<TlsResult> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                ProbeOutcome::failure("TLS Handshake Error: connection reset")
            } else {
                ProbeOutcome::Success(TlsResult::default())
            }
        }
    }

    struct StubWhois {
        delay: Duration,
        panic: bool,
    }

    impl Probe for StubWhois {
        type Output = WhoisResult;

        fn name(&self) -> &'static str {
            "WHOIS"
        }

        async fn run(&self, domain: &str) -> ProbeOutcome<WhoisResult> {
            tokio::time::sleep(self.delay).await;
            if self.panic {
                panic!("registry exploded");
            }
            ProbeOutcome::Success(WhoisResult {
                registrar: Some(format!("Registrar of {domain}")),
                ..Default::default()
            })
        }
    }

    fn coordinator(
        delays: [u64; 3],
        tls_fail: bool,
        whois_panic: bool,
        deadline: Duration,
    ) -> ProbeCoordinator<StubDns, StubTls, StubWhois> {
        ProbeCoordinator::new(
            StubDns { delay: Duration::from_millis(delays[0]) },
            StubTls { delay: Duration::from_millis(delays[1]), fail: tls_fail },
            StubWhois { delay: Duration::from_millis(delays[2]), panic: whois_panic },
            deadline,
        )
    }

    #[tokio::test]
    async fn test_all_sections_populated() {
        let report = coordinator([0, 0, 0], false, false, Duration::from_secs(5))
            .scan("example.com")
            .await;
        assert_eq!(report.domain, "example.com");
        assert_eq!(report.run_id.len(), 8);
        assert!(report.dns.is_success());
        assert!(report.tls.is_success());
        assert_eq!(
            report.whois.as_success().and_then(|w| w.registrar.as_deref()),
            Some("Registrar of example.com")
        );
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let report = coordinator([0, 0, 0], true, false, Duration::from_secs(5))
            .scan("example.com")
            .await;
        assert!(report.dns.is_success());
        assert_eq!(report.tls.error(), Some("TLS Handshake Error: connection reset"));
        assert!(report.whois.is_success());
    }

    #[tokio::test]
    async fn test_panic_is_captured_as_failure() {
        let report = coordinator([0, 0, 0], false, true, Duration::from_secs(5))
            .scan("example.com")
            .await;
        assert!(report.dns.is_success());
        assert!(report.tls.is_success());
        let message = report.whois.error().unwrap();
        assert!(message.contains("WHOIS probe task panicked"), "{message}");
    }

    #[tokio::test]
    async fn test_probes_run_in_parallel() {
        let start = Instant::now();
        let report = coordinator([300, 300, 300], false, false, Duration::from_secs(5))
            .scan("example.com")
            .await;
        let elapsed = start.elapsed();
        assert!(report.dns.is_success() && report.tls.is_success() && report.whois.is_success());
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(800), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_deadline_cancels_slow_probe() {
        let report = coordinator([0, 0, 5_000], false, false, Duration::from_millis(100))
            .scan("example.com")
            .await;
        assert!(report.dns.is_success());
        assert!(report.tls.is_success());
        let message = report.whois.error().unwrap();
        assert!(message.contains("WHOIS probe timed out"), "{message}");
    }

    #[tokio::test]
    async fn test_report_json_has_three_sections() {
        let report = coordinator([0, 0, 0], true, false, Duration::from_secs(5))
            .scan("example.com")
            .await;
        let value = serde_json::to_value(&report).unwrap();
        for section in ["dns", "tls", "whois"] {
            assert!(value.get(section).is_some(), "missing {section}");
        }
        assert!(value["tls"].get("error").is_some());
    }
}
