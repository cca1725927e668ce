//! Blob storage for classified CV uploads.
//!
//! Destinations are named containers supporting create-if-absent,
//! write-by-name and existence-check-by-name. Uploads are write-once per
//! name; uniqueness of names is the caller's concern.

pub mod fs_store;
pub mod ledger;
pub mod memory_store;

use anyhow::Result;
use async_trait::async_trait;

/// Abstract interface to a blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create a container if it does not already exist.
    async fn ensure_container(&self, container: &str) -> Result<()>;

    /// Write a payload under the given name.
    async fn put(&self, container: &str, name: &str, bytes: &[u8]) -> Result<()>;

    /// Whether an object exists under the given name.
    async fn exists(&self, container: &str, name: &str) -> Result<bool>;

    /// Read an object's bytes back.
    async fn fetch(&self, container: &str, name: &str) -> Result<Vec<u8>>;

    /// Remove an object.
    async fn delete(&self, container: &str, name: &str) -> Result<()>;
}

pub use fs_store::FsBlobStore;
pub use ledger::{LedgerEntry, ScanLedger, SqliteScanLedger};
pub use memory_store::MemoryBlobStore;
