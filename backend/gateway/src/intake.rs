//! The intake pipeline: validate, scan, route, persist, verify.
//!
//! Each upload runs the pipeline strictly in order, one attempt per step.
//! The only branching worth having is the scan-failure policy: a scanner
//! fault either quarantines the payload or rejects the request, never
//! silently trusts it.

use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use cvgate_core::{
    Destination, IntakeError, ScanFailurePolicy, ScanVerdict, StoredUpload, UploadRequest,
    INCOMING_CONTAINER,
};
use cvgate_scanner::RiskScanner;
use cvgate_storage::{BlobStore, LedgerEntry, ScanLedger};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Coordinates the scanner, the blob store and the ledger for one upload
/// at a time. Shared across requests behind an `Arc`; holds no per-request
/// state.
pub struct IntakeService {
    scanner: Arc<dyn RiskScanner>,
    store: Arc<dyn BlobStore>,
    ledger: Arc<dyn ScanLedger>,
    policy: ScanFailurePolicy,
}

impl IntakeService {
    pub fn new(
        scanner: Arc<dyn RiskScanner>,
        store: Arc<dyn BlobStore>,
        ledger: Arc<dyn ScanLedger>,
        policy: ScanFailurePolicy,
    ) -> Self {
        Self {
            scanner,
            store,
            ledger,
            policy,
        }
    }

    /// Run the full pipeline for one upload.
    pub async fn process(&self, request: UploadRequest) -> Result<StoredUpload, IntakeError> {
        self.validate(&request)?;

        let verdict = self.scan_with_policy(&request.payload).await?;
        let destination = Destination::from_verdict(&verdict);

        let blob_name = blob_name_for(request.filename.as_deref());
        self.persist(destination.container(), &blob_name, &request.payload)
            .await?;

        // The upload is durably stored at this point; a ledger fault must
        // not turn it back into a client-visible failure.
        if let Err(e) = self
            .ledger
            .record(LedgerEntry::new(&blob_name, destination))
            .await
        {
            warn!(blob_name = %blob_name, error = %e, "failed to record scan status");
        }

        info!(
            blob_name = %blob_name,
            container = destination.container(),
            is_safe = verdict.is_safe,
            size = request.payload.len(),
            "CV stored"
        );

        Ok(StoredUpload {
            blob_name,
            destination,
            verdict,
            size_bytes: request.payload.len(),
        })
    }

    /// Park a payload in the incoming container without scanning it.
    ///
    /// Used by the deferred flow; the processor picks the object up later.
    pub async fn park(&self, request: UploadRequest) -> Result<String, IntakeError> {
        self.validate(&request)?;

        let blob_name = blob_name_for(request.filename.as_deref());
        self.persist(INCOMING_CONTAINER, &blob_name, &request.payload)
            .await?;

        info!(blob_name = %blob_name, size = request.payload.len(), "CV parked for deferred scan");
        Ok(blob_name)
    }

    /// Scan a payload, applying the configured failure policy.
    pub(crate) async fn scan_with_policy(
        &self,
        payload: &[u8],
    ) -> Result<ScanVerdict, IntakeError> {
        match self.scanner.scan(payload).await {
            Ok(verdict) => Ok(verdict),
            Err(e) => match self.policy {
                ScanFailurePolicy::Quarantine => {
                    warn!(
                        scanner = self.scanner.name(),
                        error = format!("{e:#}"),
                        "scanner failed, quarantining upload"
                    );
                    Ok(ScanVerdict::unsafe_with(format!("scan failed: {e:#}")))
                }
                ScanFailurePolicy::Reject => Err(IntakeError::Scanner(format!("{e:#}"))),
            },
        }
    }

    fn validate(&self, request: &UploadRequest) -> Result<(), IntakeError> {
        if !is_pdf_content_type(&request.content_type) {
            return Err(IntakeError::UnsupportedContentType(
                request.content_type.clone(),
            ));
        }
        if request.payload.is_empty() {
            return Err(IntakeError::EmptyUpload);
        }
        Ok(())
    }

    /// Write to a container and confirm the object is actually there.
    pub(crate) async fn persist(
        &self,
        container: &str,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), IntakeError> {
        self.store
            .ensure_container(container)
            .await
            .map_err(|e| IntakeError::Storage(format!("{e:#}")))?;
        self.store
            .put(container, name, bytes)
            .await
            .map_err(|e| IntakeError::Storage(format!("{e:#}")))?;

        let present = self
            .store
            .exists(container, name)
            .await
            .map_err(|e| IntakeError::Storage(format!("{e:#}")))?;
        if !present {
            return Err(IntakeError::StorageVerify {
                container: container.to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

/// Whether a declared content type is a PDF, ignoring parameters.
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .eq_ignore_ascii_case("application/pdf")
}

/// Assign a storage name unique per upload.
///
/// Timestamp plus a random token, so concurrent uploads of the same file
/// never collide; the original filename is kept readable at the end.
pub fn blob_name_for(filename: Option<&str>) -> String {
    let millis = Utc::now().timestamp_millis();
    let token = Uuid::new_v4().simple().to_string();
    let token = &token[..8];

    match filename.map(sanitize_filename) {
        Some(name) if !name.is_empty() => format!("{millis}_{token}_{name}"),
        _ => format!("cv-{millis}_{token}.pdf"),
    }
}

/// Strip any path components and collapse whitespace to underscores.
fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();
    if base == "." || base == ".." {
        return String::new();
    }
    WHITESPACE.replace_all(base, "_").to_string()
}
