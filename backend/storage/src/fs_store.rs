//! Filesystem-backed blob store.
//!
//! A container is a subdirectory of the configured root. Writes land in a
//! `.part` file first and are renamed into place, so a name never resolves
//! to a half-written object.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::BlobStore;

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, container: &str, name: &str) -> Result<PathBuf> {
        validate_segment(container)?;
        validate_segment(name)?;
        Ok(self.root.join(container).join(name))
    }
}

/// Reject path segments that could escape the store root.
fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
    {
        bail!("invalid storage path segment: {segment:?}");
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<()> {
        validate_segment(container)?;
        let dir = self.root.join(container);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create container {container}"))?;
        Ok(())
    }

    async fn put(&self, container: &str, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(container, name)?;
        let part = path.with_file_name(format!("{name}.part"));

        fs::write(&part, bytes)
            .await
            .with_context(|| format!("failed to write {container}/{name}"))?;
        fs::rename(&part, &path)
            .await
            .with_context(|| format!("failed to finalize {container}/{name}"))?;

        debug!(container, name, size = bytes.len(), "stored blob");
        Ok(())
    }

    async fn exists(&self, container: &str, name: &str) -> Result<bool> {
        let path = self.resolve(container, name)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn fetch(&self, container: &str, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(container, name)?;
        fs::read(&path)
            .await
            .with_context(|| format!("failed to read {container}/{name}"))
    }

    async fn delete(&self, container: &str, name: &str) -> Result<()> {
        let path = self.resolve(container, name)?;
        fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete {container}/{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn scratch_root() -> PathBuf {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        std::env::temp_dir().join(format!("cvgate-fs-store-{nanos}"))
    }

    async fn cleanup(root: &Path) {
        let _ = fs::remove_dir_all(root).await;
    }

    #[tokio::test]
    async fn write_verify_and_read_back() {
        let root = scratch_root();
        let store = FsBlobStore::new(&root);

        store.ensure_container("safe-cv").await.unwrap();
        store.put("safe-cv", "123_cv.pdf", b"%PDF-1.7 body").await.unwrap();

        assert!(store.exists("safe-cv", "123_cv.pdf").await.unwrap());
        assert_eq!(
            store.fetch("safe-cv", "123_cv.pdf").await.unwrap(),
            b"%PDF-1.7 body"
        );

        cleanup(&root).await;
    }

    #[tokio::test]
    async fn missing_object_does_not_exist() {
        let root = scratch_root();
        let store = FsBlobStore::new(&root);
        store.ensure_container("unsafe-cv").await.unwrap();

        assert!(!store.exists("unsafe-cv", "nope.pdf").await.unwrap());

        cleanup(&root).await;
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let root = scratch_root();
        let store = FsBlobStore::new(&root);
        store.ensure_container("safe-cv").await.unwrap();

        assert!(store.put("safe-cv", "../escape.pdf", b"x").await.is_err());
        assert!(store.put("safe-cv", "a/b.pdf", b"x").await.is_err());
        assert!(store.put("..", "x.pdf", b"x").await.is_err());

        cleanup(&root).await;
    }

    #[tokio::test]
    async fn no_part_file_left_after_put() {
        let root = scratch_root();
        let store = FsBlobStore::new(&root);
        store.ensure_container("safe-cv").await.unwrap();
        store.put("safe-cv", "a.pdf", b"x").await.unwrap();

        assert!(!fs::try_exists(root.join("safe-cv").join("a.pdf.part"))
            .await
            .unwrap());

        cleanup(&root).await;
    }
}
