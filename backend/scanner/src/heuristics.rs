//! In-process PDF risk heuristics.
//!
//! Flags constructs commonly used to carry active content in a PDF. A file
//! with no flagged constructs is considered safe; anything that does not
//! even look like a PDF is unsafe.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::RiskScanner;
use cvgate_core::ScanVerdict;

/// PDF magic: %PDF in the first bytes of the file.
const PDF_MAGIC: &[u8] = b"%PDF";

const RISKY_PDF_PATTERNS: &[&str] = &[
    "/JavaScript", // embedded script dictionaries
    "/JS",
    "/Launch",     // launch-action external programs
    "/OpenAction", // auto-run on open
    "/AA",         // additional-actions triggers
    "/EmbeddedFile",
    "/XFA",
    "/RichMedia",
];

/// Check if data looks like a PDF.
pub fn is_pdf(data: &[u8]) -> bool {
    data.len() >= PDF_MAGIC.len() && &data[..PDF_MAGIC.len()] == PDF_MAGIC
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Pattern-based scanner that runs entirely in-process.
#[derive(Debug, Default)]
pub struct HeuristicScanner;

impl HeuristicScanner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RiskScanner for HeuristicScanner {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn scan(&self, bytes: &[u8]) -> Result<ScanVerdict> {
        if !is_pdf(bytes) {
            return Ok(ScanVerdict::unsafe_with(
                "not a PDF document (missing %PDF header)",
            ));
        }

        let flagged: Vec<&str> = RISKY_PDF_PATTERNS
            .iter()
            .filter(|p| contains(bytes, p.as_bytes()))
            .copied()
            .collect();

        if flagged.is_empty() {
            Ok(ScanVerdict::safe())
        } else {
            warn!(patterns = ?flagged, "PDF payload flagged by heuristic scan");
            Ok(ScanVerdict::unsafe_with(format!(
                "flagged constructs: {}",
                flagged.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_pdf_is_safe() {
        let verdict = HeuristicScanner::new()
            .scan(b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj")
            .await
            .unwrap();
        assert!(verdict.is_safe);
        assert!(verdict.details.is_none());
    }

    #[tokio::test]
    async fn javascript_action_is_flagged() {
        let verdict = HeuristicScanner::new()
            .scan(b"%PDF-1.4\n<< /OpenAction << /S /JavaScript /JS (app.alert(1)) >> >>")
            .await
            .unwrap();
        assert!(!verdict.is_safe);
        assert!(verdict.details.unwrap().contains("/JavaScript"));
    }

    #[tokio::test]
    async fn non_pdf_bytes_are_unsafe_not_a_crash() {
        let verdict = HeuristicScanner::new()
            .scan(&[0xff, 0xd8, 0xff, 0xe0])
            .await
            .unwrap();
        assert!(!verdict.is_safe);
    }

    #[tokio::test]
    async fn empty_input_is_handled() {
        let verdict = HeuristicScanner::new().scan(&[]).await.unwrap();
        assert!(!verdict.is_safe);
    }
}
