use anyhow::{Context, Result};

use cvgate_core::{IntakeError, ScanFailurePolicy};

/// cvgate runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Root directory of the filesystem blob store
    pub storage_root: Option<String>,
    /// SQLite scan-ledger path
    pub ledger_db: String,
    /// Remote scanner endpoint; unset means the in-process heuristic scanner
    pub scanner_url: Option<String>,
    /// What to do when the scanner itself fails
    pub scan_failure_policy: ScanFailurePolicy,
    /// Upper bound on an upload body
    pub max_upload_bytes: usize,
    /// Log level
    pub log_level: String,
    /// Directory for rolling log files
    pub log_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            storage_root: None,
            ledger_db: "cvgate-ledger.db".to_string(),
            scanner_url: None,
            scan_failure_policy: ScanFailurePolicy::default(),
            max_upload_bytes: 10 * 1024 * 1024,
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Malformed values fail here, at startup, not on the first request.
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let scan_failure_policy = match std::env::var("CVGATE_SCAN_FAILURE_POLICY") {
            Ok(raw) => ScanFailurePolicy::parse(&raw).with_context(|| {
                format!("invalid CVGATE_SCAN_FAILURE_POLICY {raw:?} (expected quarantine or reject)")
            })?,
            Err(_) => ScanFailurePolicy::default(),
        };

        let max_upload_bytes = match std::env::var("CVGATE_MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid CVGATE_MAX_UPLOAD_BYTES {raw:?}"))?,
            Err(_) => defaults.max_upload_bytes,
        };

        Ok(Self {
            bind_address: std::env::var("CVGATE_BIND").unwrap_or(defaults.bind_address),
            port: std::env::var("CVGATE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            storage_root: std::env::var("CVGATE_STORAGE_ROOT").ok(),
            ledger_db: std::env::var("CVGATE_LEDGER_DB").unwrap_or(defaults.ledger_db),
            scanner_url: std::env::var("CVGATE_SCANNER_URL").ok(),
            scan_failure_policy,
            max_upload_bytes,
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_dir: std::env::var("CVGATE_LOG_DIR").unwrap_or(defaults.log_dir),
        })
    }

    /// The storage location is the one credential the service cannot run
    /// without (outside `--memory` mode).
    pub fn require_storage_root(&self) -> Result<&str> {
        match self.storage_root.as_deref() {
            Some(root) if !root.trim().is_empty() => Ok(root),
            _ => Err(IntakeError::MissingConfig("CVGATE_STORAGE_ROOT".into()).into()),
        }
    }
}
