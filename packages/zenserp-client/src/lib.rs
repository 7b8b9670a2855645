//! Pure Zenserp REST API client.
//!
//! Covers the batch endpoints only: submit many searches as one batch, then
//! look the batch up by id until its results are ready.
//!
//! # Example
//!
//! ```rust,ignore
//! use zenserp_client::{BatchJob, ZenserpClient};
//!
//! let client = ZenserpClient::new("your-api-key".into());
//! let created = client.create_batch("job-1: coffee", None, &jobs).await?;
//! let batch = client.get_batch(&created.id).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{Result, ZenserpError};
pub use types::{Batch, BatchJob, BatchJobResult, BatchState, OrganicResult, ResultQuery};

use std::time::Duration;

use types::CreateBatchRequest;

const BASE_URL: &str = "https://app.zenserp.com/api/v2";

pub struct ZenserpClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ZenserpClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Client whose requests fail once `timeout` elapses.
    pub fn with_timeout(api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at a different host (used against local fakes).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Submit all jobs as a single batch. Returns the created batch metadata.
    pub async fn create_batch(
        &self,
        name: &str,
        webhook_url: Option<&str>,
        jobs: &[BatchJob],
    ) -> Result<Batch> {
        let body = CreateBatchRequest {
            name,
            webhook_url,
            jobs,
        };

        let url = format!("{}/batches", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let batch: Batch = Self::decode(resp).await?;
        tracing::debug!(batch_id = %batch.id, jobs = jobs.len(), "Created Zenserp batch");
        Ok(batch)
    }

    /// Fetch a batch and whatever results it has so far.
    pub async fn get_batch(&self, batch_id: &str) -> Result<Batch> {
        let url = format!("{}/batches/{}", self.base_url, batch_id);
        let resp = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        Self::decode(resp).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ZenserpError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
