use serde::{Deserialize, Serialize};

/// Container receiving uploads that passed the risk scan.
pub const SAFE_CONTAINER: &str = "safe-cv";
/// Container receiving uploads that failed (or could not complete) the scan.
pub const UNSAFE_CONTAINER: &str = "unsafe-cv";
/// Container where deferred uploads are parked until the processor scans them.
pub const INCOMING_CONTAINER: &str = "incoming-cv";

/// One inbound upload, owned by the handler for the duration of a request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Vec<u8>,
    pub content_type: String,
    pub filename: Option<String>,
}

impl UploadRequest {
    pub fn new(payload: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            payload,
            content_type: content_type.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Safety verdict produced by the risk scanner for one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanVerdict {
    pub is_safe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ScanVerdict {
    pub fn safe() -> Self {
        Self {
            is_safe: true,
            details: None,
        }
    }

    pub fn unsafe_with(details: impl Into<String>) -> Self {
        Self {
            is_safe: false,
            details: Some(details.into()),
        }
    }
}

/// One of the two mutually exclusive storage destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Safe,
    Unsafe,
}

impl Destination {
    /// Destination selection is a pure function of the verdict.
    pub fn from_verdict(verdict: &ScanVerdict) -> Self {
        if verdict.is_safe {
            Destination::Safe
        } else {
            Destination::Unsafe
        }
    }

    pub fn container(&self) -> &'static str {
        match self {
            Destination::Safe => SAFE_CONTAINER,
            Destination::Unsafe => UNSAFE_CONTAINER,
        }
    }
}

/// What happens when the scanner itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanFailurePolicy {
    /// Degrade to an unsafe verdict and store the upload in the unsafe
    /// container. The upload is never lost and never trusted by default.
    #[default]
    Quarantine,
    /// Surface the scanner fault as a server error without storing.
    Reject,
}

impl ScanFailurePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quarantine" => Some(ScanFailurePolicy::Quarantine),
            "reject" => Some(ScanFailurePolicy::Reject),
            _ => None,
        }
    }
}

/// Outcome of a completed intake: where the payload landed and under what name.
#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    pub blob_name: String,
    pub destination: Destination,
    pub verdict: ScanVerdict,
    pub size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_verdict_selects_safe_container() {
        let dest = Destination::from_verdict(&ScanVerdict::safe());
        assert_eq!(dest, Destination::Safe);
        assert_eq!(dest.container(), "safe-cv");
    }

    #[test]
    fn unsafe_verdict_selects_unsafe_container() {
        let dest = Destination::from_verdict(&ScanVerdict::unsafe_with("flagged"));
        assert_eq!(dest, Destination::Unsafe);
        assert_eq!(dest.container(), "unsafe-cv");
    }

    #[test]
    fn policy_parses_known_values() {
        assert_eq!(
            ScanFailurePolicy::parse("quarantine"),
            Some(ScanFailurePolicy::Quarantine)
        );
        assert_eq!(
            ScanFailurePolicy::parse("REJECT"),
            Some(ScanFailurePolicy::Reject)
        );
        assert_eq!(ScanFailurePolicy::parse("retry"), None);
    }

    #[test]
    fn policy_defaults_to_quarantine() {
        assert_eq!(ScanFailurePolicy::default(), ScanFailurePolicy::Quarantine);
    }
}
