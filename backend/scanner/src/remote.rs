//! Client for a remote scanning endpoint.
//!
//! Posts the payload to a configured URL and maps the JSON response through
//! the verdict adapter. Any transport or shape problem surfaces as `Err`;
//! the gateway's failure policy decides what happens next.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::verdict::verdict_from_raw;
use crate::RiskScanner;
use cvgate_core::ScanVerdict;

pub struct RemoteScanner {
    endpoint: String,
    client: Client,
}

impl RemoteScanner {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl RiskScanner for RemoteScanner {
    fn name(&self) -> &str {
        "remote"
    }

    async fn scan(&self, bytes: &[u8]) -> Result<ScanVerdict> {
        let raw: Value = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .context("scanner endpoint unreachable")?
            .error_for_status()
            .context("scanner endpoint returned an error status")?
            .json()
            .await
            .context("scanner endpoint returned a non-JSON body")?;

        verdict_from_raw(&raw)
    }
}
