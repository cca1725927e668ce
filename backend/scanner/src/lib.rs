//! Risk scanning for uploaded CV payloads.
//!
//! The gateway hands every upload to a [`RiskScanner`] and routes the bytes
//! on the returned verdict. Two implementations are provided: an in-process
//! heuristic scanner and a client for a remote scanning endpoint.

pub mod heuristics;
pub mod remote;
pub mod verdict;

use anyhow::Result;
use async_trait::async_trait;

use cvgate_core::ScanVerdict;

/// Interface to a PDF risk scanner.
///
/// Implementations must tolerate arbitrary byte content (non-PDF, truncated,
/// malformed) without panicking; internal faults surface as `Err`.
#[async_trait]
pub trait RiskScanner: Send + Sync {
    /// Short name of this scanner, for logs and diagnostics.
    fn name(&self) -> &str;

    /// Scan a payload and return its safety verdict.
    async fn scan(&self, bytes: &[u8]) -> Result<ScanVerdict>;
}

pub use heuristics::HeuristicScanner;
pub use remote::RemoteScanner;
pub use verdict::verdict_from_raw;
