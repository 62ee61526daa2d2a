//! Reqwest-backed remote store for a hosted collection API.
//!
//! Bulk appends are a single POST of the record array to
//! `{base}/{collection}`; session closes are a PATCH to
//! `{base}/{collection}/{id}`. Connections are pooled and kept alive across
//! flushes.
//!
//! The write path carries no internal retry and no request timeout: retry is
//! the tracker's accumulation policy, and a hung write holds the buffer until
//! it resolves.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use log::{debug, warn};
use reqwest::Client;

use crate::store::{PositionRecord, RemoteStore, SessionPatch, StoreError};

// Flushes arrive at most every few seconds from a single tracker
const POOL_MAX_IDLE_PER_HOST: usize = 4;

/// Remote store over a hosted HTTP collection API.
pub struct HttpStore {
    client: Client,
    base_url: String,
    auth_header: String,
}

impl HttpStore {
    /// Create a store for the hosted API at `base_url`, authenticating with
    /// the given API key.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let auth =
            base64::engine::general_purpose::STANDARD.encode(format!("API_KEY:{api_key}"));

        let client = Client::builder()
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Basic {auth}"),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    fn row_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, id)
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn bulk_append(
        &self,
        collection: &str,
        records: &[PositionRecord],
    ) -> Result<(), StoreError> {
        let body =
            serde_json::to_vec(records).map_err(|e| StoreError::Serialize(e.to_string()))?;

        let response = self
            .client
            .post(self.collection_url(collection))
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "bulk append of {} record(s) to {collection} failed: HTTP {status}",
                records.len()
            );
            return Err(StoreError::Status(status.as_u16()));
        }

        debug!("appended {} record(s) to {collection}", records.len());
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: &SessionPatch,
    ) -> Result<(), StoreError> {
        let body =
            serde_json::to_vec(fields).map_err(|e| StoreError::Serialize(e.to_string()))?;

        let response = self
            .client
            .patch(self.row_url(collection, id))
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("update of {collection}/{id} failed: HTTP {status}");
            return Err(StoreError::Status(status.as_u16()));
        }

        debug!("updated {collection}/{id}");
        Ok(())
    }
}
