//! Deferred re-scan processor.
//!
//! Uploads parked in the incoming container are scanned out of band: fetch
//! the bytes, scan, write to the verdict destination, record the outcome,
//! delete the parked original. Jobs arrive over an mpsc channel and are
//! processed one at a time; a failed job is logged and dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::intake::IntakeService;
use cvgate_core::{Destination, IntakeError, INCOMING_CONTAINER};
use cvgate_storage::{BlobStore, LedgerEntry, ScanLedger};

/// One deferred-scan job: the name of a blob parked in `incoming-cv`.
#[derive(Debug, Clone)]
pub struct RescanJob {
    pub blob_name: String,
}

pub struct RescanProcessor {
    intake: Arc<IntakeService>,
    store: Arc<dyn BlobStore>,
    ledger: Arc<dyn ScanLedger>,
}

impl RescanProcessor {
    pub fn new(
        intake: Arc<IntakeService>,
        store: Arc<dyn BlobStore>,
        ledger: Arc<dyn ScanLedger>,
    ) -> Self {
        Self {
            intake,
            store,
            ledger,
        }
    }

    /// Consume jobs until the channel closes.
    pub async fn run(self, mut rx: mpsc::Receiver<RescanJob>) {
        info!("rescan processor started");
        while let Some(job) = rx.recv().await {
            match self.process_one(&job.blob_name).await {
                Ok(destination) => info!(
                    blob_name = %job.blob_name,
                    container = destination.container(),
                    "deferred scan complete"
                ),
                Err(e) => error!(
                    blob_name = %job.blob_name,
                    error = %e,
                    "deferred scan failed"
                ),
            }
        }
        info!("rescan processor stopped");
    }

    /// Scan one parked object and move it to its destination.
    pub async fn process_one(&self, blob_name: &str) -> Result<Destination, IntakeError> {
        let bytes = self
            .store
            .fetch(INCOMING_CONTAINER, blob_name)
            .await
            .map_err(|e| IntakeError::Storage(format!("{e:#}")))?;

        let verdict = self.intake.scan_with_policy(&bytes).await?;
        let destination = Destination::from_verdict(&verdict);

        self.intake
            .persist(destination.container(), blob_name, &bytes)
            .await?;

        if let Err(e) = self
            .ledger
            .record(LedgerEntry::new(blob_name, destination))
            .await
        {
            error!(blob_name = %blob_name, error = %e, "failed to record deferred scan status");
        }

        // The object now exists at its destination; only then drop the
        // parked copy.
        self.store
            .delete(INCOMING_CONTAINER, blob_name)
            .await
            .map_err(|e| IntakeError::Storage(format!("{e:#}")))?;

        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::Result;
    use async_trait::async_trait;

    use cvgate_core::{
        ScanFailurePolicy, ScanVerdict, UploadRequest, SAFE_CONTAINER, UNSAFE_CONTAINER,
    };
    use cvgate_scanner::RiskScanner;
    use cvgate_storage::{MemoryBlobStore, SqliteScanLedger};

    struct FixedScanner(ScanVerdict);

    #[async_trait]
    impl RiskScanner for FixedScanner {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn scan(&self, _bytes: &[u8]) -> Result<ScanVerdict> {
            Ok(self.0.clone())
        }
    }

    fn setup(
        verdict: ScanVerdict,
    ) -> (Arc<IntakeService>, Arc<MemoryBlobStore>, RescanProcessor) {
        let store: Arc<MemoryBlobStore> = Arc::new(MemoryBlobStore::new());
        let ledger = Arc::new(SqliteScanLedger::in_memory().unwrap());
        let intake = Arc::new(IntakeService::new(
            Arc::new(FixedScanner(verdict)),
            store.clone(),
            ledger.clone(),
            ScanFailurePolicy::default(),
        ));
        let processor = RescanProcessor::new(intake.clone(), store.clone(), ledger);
        (intake, store, processor)
    }

    #[tokio::test]
    async fn parked_object_moves_to_safe_container() {
        let (intake, store, processor) = setup(ScanVerdict::safe());

        let name = intake
            .park(UploadRequest::new(
                b"%PDF-1.4 deferred".to_vec(),
                "application/pdf",
            ))
            .await
            .unwrap();

        let destination = processor.process_one(&name).await.unwrap();

        assert_eq!(destination, Destination::Safe);
        assert!(store.exists(SAFE_CONTAINER, &name).await.unwrap());
        assert!(!store.exists(INCOMING_CONTAINER, &name).await.unwrap());
    }

    #[tokio::test]
    async fn flagged_object_moves_to_unsafe_container() {
        let (intake, store, processor) = setup(ScanVerdict::unsafe_with("flagged"));

        let name = intake
            .park(UploadRequest::new(
                b"%PDF-1.4 deferred".to_vec(),
                "application/pdf",
            ))
            .await
            .unwrap();

        processor.process_one(&name).await.unwrap();

        assert!(store.exists(UNSAFE_CONTAINER, &name).await.unwrap());
        assert!(!store.exists(INCOMING_CONTAINER, &name).await.unwrap());
    }

    #[tokio::test]
    async fn missing_parked_object_is_a_storage_fault() {
        let (_intake, _store, processor) = setup(ScanVerdict::safe());
        let err = processor.process_one("never-parked.pdf").await.unwrap_err();
        assert!(matches!(err, IntakeError::Storage(_)));
    }

    #[tokio::test]
    async fn channel_driven_run_processes_jobs() {
        let (intake, store, processor) = setup(ScanVerdict::safe());

        let name = intake
            .park(UploadRequest::new(
                b"%PDF-1.4 queued".to_vec(),
                "application/pdf",
            ))
            .await
            .unwrap();

        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(processor.run(rx));

        tx.send(RescanJob {
            blob_name: name.clone(),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(store.exists(SAFE_CONTAINER, &name).await.unwrap());
    }
}
