use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::BlobStore;

/// Simple in-memory blob store for tests and `--memory` runs.
#[derive(Default)]
pub struct MemoryBlobStore {
    containers: RwLock<HashSet<String>>,
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently held in a container.
    pub fn object_count(&self, container: &str) -> usize {
        self.objects
            .read()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == container)
            .count()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn ensure_container(&self, container: &str) -> Result<()> {
        self.containers.write().unwrap().insert(container.to_string());
        Ok(())
    }

    async fn put(&self, container: &str, name: &str, bytes: &[u8]) -> Result<()> {
        if !self.containers.read().unwrap().contains(container) {
            bail!("container {container} does not exist");
        }
        self.objects
            .write()
            .unwrap()
            .insert((container.to_string(), name.to_string()), bytes.to_vec());
        Ok(())
    }

    async fn exists(&self, container: &str, name: &str) -> Result<bool> {
        Ok(self
            .objects
            .read()
            .unwrap()
            .contains_key(&(container.to_string(), name.to_string())))
    }

    async fn fetch(&self, container: &str, name: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .unwrap()
            .get(&(container.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("object {container}/{name} not found"))
    }

    async fn delete(&self, container: &str, name: &str) -> Result<()> {
        self.objects
            .write()
            .unwrap()
            .remove(&(container.to_string(), name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_fetch_round_trips() {
        let store = MemoryBlobStore::new();
        store.ensure_container("safe-cv").await.unwrap();
        store.put("safe-cv", "a.pdf", b"%PDF-1.4 data").await.unwrap();

        assert!(store.exists("safe-cv", "a.pdf").await.unwrap());
        assert_eq!(store.fetch("safe-cv", "a.pdf").await.unwrap(), b"%PDF-1.4 data");
    }

    #[tokio::test]
    async fn put_into_missing_container_fails() {
        let store = MemoryBlobStore::new();
        assert!(store.put("nowhere", "a.pdf", b"x").await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let store = MemoryBlobStore::new();
        store.ensure_container("incoming-cv").await.unwrap();
        store.put("incoming-cv", "a.pdf", b"x").await.unwrap();
        store.delete("incoming-cv", "a.pdf").await.unwrap();
        assert!(!store.exists("incoming-cv", "a.pdf").await.unwrap());
    }
}
