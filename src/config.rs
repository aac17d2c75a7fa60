// src/config.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::logging::project_directory;

pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TLS_PORT: u16 = 443;
pub const DEFAULT_TLS_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_WHOIS_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_SCAN_DEADLINE: Duration = Duration::from_secs(30);

/// Timeouts and ports shared by the probes of one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Per-query resolver timeout.
    pub dns_timeout: Duration,
    pub tls_port: u16,
    /// Applies to the TCP connect and to every read/write of the handshake.
    pub tls_timeout: Duration,
    pub whois_timeout: Duration,
    /// Upper bound for each probe, after which it is cancelled.
    pub scan_deadline: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            tls_port: DEFAULT_TLS_PORT,
            tls_timeout: DEFAULT_TLS_TIMEOUT,
            whois_timeout: DEFAULT_WHOIS_TIMEOUT,
            scan_deadline: DEFAULT_SCAN_DEADLINE,
        }
    }
}

/// Overrides persisted on disk. Durations are whole seconds.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PersistentSettings {
    pub dns_timeout_secs: Option<u64>,
    pub tls_port: Option<u16>,
    pub tls_timeout_secs: Option<u64>,
    pub whois_timeout_secs: Option<u64>,
    pub scan_deadline_secs: Option<u64>,
}

impl PersistentSettings {
    pub fn apply(&self, config: &mut ScanConfig) {
        if let Some(secs) = self.dns_timeout_secs {
            config.dns_timeout = Duration::from_secs(secs);
        }
        if let Some(port) = self.tls_port {
            config.tls_port = port;
        }
        if let Some(secs) = self.tls_timeout_secs {
            config.tls_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.whois_timeout_secs {
            config.whois_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.scan_deadline_secs {
            config.scan_deadline = Duration::from_secs(secs);
        }
    }
}

pub fn settings_path() -> PathBuf {
    match project_directory() {
        Some(proj_dirs) => proj_dirs.config_dir().join("settings.json"),
        None => PathBuf::from(".").join(".config").join("settings.json"),
    }
}

/// Reads settings from `path`. A missing file yields defaults; an unreadable
/// or invalid one is logged and also yields defaults.
pub fn load_settings(path: &Path) -> PersistentSettings {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PersistentSettings::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read settings file.");
            return PersistentSettings::default();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Ignoring invalid settings file.");
        PersistentSettings::default()
    })
}
