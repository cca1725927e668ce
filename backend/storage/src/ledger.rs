//! SQLite-backed scan-status ledger.
//!
//! Records one row per stored upload: where it landed and under which
//! verdict. The row survives the request so the status endpoint and the
//! deferred processor can answer "what happened to this file".

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use cvgate_core::Destination;

/// One recorded scan outcome.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub blob_name: String,
    pub container: String,
    pub status: String,
    pub recorded_at: String,
}

impl LedgerEntry {
    /// Build an entry for a payload stored at the given destination.
    pub fn new(blob_name: impl Into<String>, destination: Destination) -> Self {
        let status = match destination {
            Destination::Safe => "safe",
            Destination::Unsafe => "unsafe",
        };
        Self {
            blob_name: blob_name.into(),
            container: destination.container().to_string(),
            status: status.to_string(),
            recorded_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Abstract interface to the scan-status ledger.
#[async_trait]
pub trait ScanLedger: Send + Sync {
    /// Insert or replace the row for a blob name.
    async fn record(&self, entry: LedgerEntry) -> Result<()>;

    /// Look up the row for a blob name.
    async fn get(&self, blob_name: &str) -> Result<Option<LedgerEntry>>;
}

pub struct SqliteScanLedger {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS scan_status (
    blob_name   TEXT PRIMARY KEY,
    container   TEXT NOT NULL,
    status      TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);";

impl SqliteScanLedger {
    /// Create or open a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("failed to open scan ledger database")?;
        conn.execute_batch(&format!("PRAGMA journal_mode=WAL;\n{SCHEMA}"))
            .context("failed to initialize scan ledger schema")?;

        info!("scan ledger opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory ledger (for tests and `--memory` runs).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl ScanLedger for SqliteScanLedger {
    async fn record(&self, entry: LedgerEntry) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO scan_status (blob_name, container, status, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.blob_name,
                entry.container,
                entry.status,
                entry.recorded_at,
            ],
        )?;
        debug!(blob_name = %entry.blob_name, status = %entry.status, "recorded scan status");
        Ok(())
    }

    async fn get(&self, blob_name: &str) -> Result<Option<LedgerEntry>> {
        let conn = self.conn.lock().await;
        let entry = conn
            .query_row(
                "SELECT blob_name, container, status, recorded_at
                 FROM scan_status WHERE blob_name = ?1",
                params![blob_name],
                |row| {
                    Ok(LedgerEntry {
                        blob_name: row.get(0)?,
                        container: row.get(1)?,
                        status: row.get(2)?,
                        recorded_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_and_get_round_trips() {
        let ledger = SqliteScanLedger::in_memory().unwrap();
        ledger
            .record(LedgerEntry::new("171234_cv.pdf", Destination::Safe))
            .await
            .unwrap();

        let entry = ledger.get("171234_cv.pdf").await.unwrap().unwrap();
        assert_eq!(entry.container, "safe-cv");
        assert_eq!(entry.status, "safe");
    }

    #[tokio::test]
    async fn rescan_replaces_previous_row() {
        let ledger = SqliteScanLedger::in_memory().unwrap();
        ledger
            .record(LedgerEntry::new("cv.pdf", Destination::Safe))
            .await
            .unwrap();
        ledger
            .record(LedgerEntry::new("cv.pdf", Destination::Unsafe))
            .await
            .unwrap();

        let entry = ledger.get("cv.pdf").await.unwrap().unwrap();
        assert_eq!(entry.status, "unsafe");
        assert_eq!(entry.container, "unsafe-cv");
    }

    #[tokio::test]
    async fn unknown_name_returns_none() {
        let ledger = SqliteScanLedger::in_memory().unwrap();
        assert!(ledger.get("missing.pdf").await.unwrap().is_none());
    }
}
