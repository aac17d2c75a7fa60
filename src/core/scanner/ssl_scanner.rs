// src/core/scanner/ssl_scanner.rs

use std::collections::BTreeMap;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use native_tls::TlsConnector;
use tokio::net::lookup_host;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info, warn};
use x509_parser::objects::{oid2abbrev, oid_registry};
use x509_parser::prelude::*;

use super::Probe;
use crate::core::models::{ProbeOutcome, TlsResult};

/// Certificates expiring in fewer days than this are flagged.
const EXPIRY_WARNING_DAYS: i64 = 30;

/// Inspects the certificate presented on a TLS port.
///
/// Chain and hostname verification are disabled: the probe reports what the
/// server presents, including self-signed or mismatched certificates.
#[derive(Debug, Clone)]
pub struct TlsProbe {
    port: u16,
    timeout: Duration,
}

impl TlsProbe {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Connects to `domain` on the configured port and reads its leaf certificate.
    ///
    /// # Arguments
    /// * `domain` - A validated host name, without scheme or port.
    ///
    /// # Returns
    /// `ProbeOutcome::Success` with the certificate details, or a failure
    /// naming the stage that broke (address resolution, TCP, handshake, parse).
    /// Every stage is bounded by the probe timeout: name resolution runs on the
    /// async side under `tokio::time::timeout`, and the blocking handshake uses
    /// connect, read and write timeouts on its socket.
    pub async fn inspect(&self, domain: &str) -> ProbeOutcome<TlsResult> {
        info!(target = %domain, port = self.port, "Starting SSL/TLS scan.");
        let scan_result = match resolve_addrs(domain, self.port, self.timeout).await {
            Ok(addrs) => {
                let target_owned = domain.to_string();
                let timeout = self.timeout;
                debug!("Spawning blocking task for TLS connection.");
                spawn_blocking(move || perform_tls_scan(&target_owned, &addrs, timeout))
                    .await
                    .unwrap_or_else(|e| {
                        error!(panic = %e, "Blocking SSL scan task panicked!");
                        Err(format!("Task panicked: {e}"))
                    })
            }
            Err(message) => Err(message),
        };

        match &scan_result {
            Ok(tls) => info!(days_to_expire = tls.days_to_expire, "SSL/TLS scan finished."),
            Err(message) => warn!(error = %message, "SSL/TLS scan failed."),
        }
        scan_result.into()
    }
}

impl Probe for TlsProbe {
    type Output = TlsResult;

    fn name(&self) -> &'static str {
        "TLS"
    }

    async fn run(&self, domain: &str) -> ProbeOutcome<TlsResult> {
        self.inspect(domain).await
    }
}

/// Resolves `target:port` without blocking a runtime thread.
async fn resolve_addrs(target: &str, port: u16, timeout: Duration) -> Result<Vec<SocketAddr>, String> {
    let addrs = tokio::time::timeout(timeout, lookup_host((target, port)))
        .await
        .map_err(|_| {
            format!("Address Resolution Error: timed out after {}s", timeout.as_secs_f32())
        })?
        .map_err(|e| format!("Address Resolution Error: {e}"))?;
    Ok(addrs.collect())
}

/// Connects, handshakes and extracts the leaf certificate. Every socket
/// opened here is owned by a local and closed when it goes out of scope.
fn perform_tls_scan(target: &str, addrs: &[SocketAddr], timeout: Duration) -> Result<TlsResult, String> {
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| format!("TlsConnector Error: {e}"))?;

    debug!(host = target, addrs = addrs.len(), "Connecting TCP stream.");
    let stream = connect_first(addrs, timeout)?;
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|()| stream.set_write_timeout(Some(timeout)))
        .map_err(|e| format!("TCP Connection Error: {e}"))?;

    debug!(host = target, "Performing TLS handshake.");
    let mut stream = connector
        .connect(target, stream)
        .map_err(|e| format!("TLS Handshake Error: {e}"))?;

    let cert = match stream.peer_certificate() {
        Ok(Some(cert)) => cert,
        Ok(None) => return Err("Server did not provide a certificate.".to_string()),
        Err(e) => return Err(format!("Could not get peer certificate: {e}")),
    };
    let cert_der = cert
        .to_der()
        .map_err(|e| format!("Could not convert certificate to DER: {e}"))?;

    if let Err(e) = stream.shutdown() {
        debug!(error = %e, "TLS shutdown was not clean.");
    }

    certificate_details(&cert_der, Utc::now())
}

fn connect_first(addrs: &[SocketAddr], timeout: Duration) -> Result<TcpStream, String> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "TCP connection attempt failed.");
                last_error = Some(e);
            }
        }
    }
    Err(match last_error {
        Some(e) => format!("TCP Connection Error: {e}"),
        None => "TCP Connection Error: no addresses resolved".to_string(),
    })
}

/// Builds a `TlsResult` from a DER-encoded leaf certificate as seen at `now`.
pub fn certificate_details(cert_der: &[u8], now: DateTime<Utc>) -> Result<TlsResult, String> {
    let (_, x509) =
        parse_x509_certificate(cert_der).map_err(|e| format!("X.509 Parse Error: {e}"))?;
    info!(subject = %x509.subject(), issuer = %x509.issuer(), "Successfully parsed certificate.");

    let validity = x509.validity();
    let not_before = asn1_time_to_chrono_utc(&validity.not_before)?;
    let not_after = asn1_time_to_chrono_utc(&validity.not_after)?;
    let (days_to_expire, is_expired, expiring_soon) = expiry_window(not_after, now);

    Ok(TlsResult {
        subject: name_attributes(x509.subject()),
        issuer: name_attributes(x509.issuer()),
        version: x509.version().0 + 1,
        serial_number: x509.serial.to_str_radix(16).to_uppercase(),
        not_before: not_before.to_rfc3339_opts(SecondsFormat::Secs, true),
        not_after: not_after.to_rfc3339_opts(SecondsFormat::Secs, true),
        subject_alt_names: subject_alt_names(&x509),
        is_expired,
        expiring_soon,
        days_to_expire,
    })
}

/// Returns `(days_to_expire, is_expired, expiring_soon)`.
///
/// Days are whole days truncated toward zero, so a certificate that expired
/// a few hours ago still reports 0 and is not yet considered expired.
pub fn expiry_window(not_after: DateTime<Utc>, now: DateTime<Utc>) -> (i64, bool, bool) {
    let days = not_after.signed_duration_since(now).num_days();
    (days, days < 0, (0..EXPIRY_WARNING_DAYS).contains(&days))
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| format!("Certificate time out of range: {time}"))
}

fn name_attributes(name: &X509Name) -> BTreeMap<String, String> {
    name.iter_attributes()
        .map(|attr| {
            let key = oid2abbrev(attr.attr_type(), oid_registry())
                .map(str::to_string)
                .unwrap_or_else(|_| attr.attr_type().to_id_string());
            let value = attr
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|_| "<non-string value>".to_string());
            (key, value)
        })
        .collect()
}

fn subject_alt_names(x509: &X509Certificate) -> Vec<String> {
    x509.subject_alternative_name()
        .ok()
        .flatten()
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}
