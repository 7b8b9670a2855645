//! Search batches backed by Zenserp.

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;
use zenserp_client::{Batch, BatchJob, ZenserpClient};

use super::{BaseSearchBatchService, RankedResult, ResultGroup, SearchBatchStatus, SearchQuery};

pub struct ZenserpSearchService {
    client: ZenserpClient,
    webhook_url: Option<String>,
}

impl ZenserpSearchService {
    pub fn new(client: ZenserpClient, webhook_url: Option<String>) -> Self {
        Self {
            client,
            webhook_url,
        }
    }

    fn to_batch_job(query: &SearchQuery) -> BatchJob {
        BatchJob {
            query: query.query.clone(),
            num: query.num.to_string(),
            search_engine: query.search_engine.clone(),
            device: query.device.clone(),
            country: query.country.clone(),
            location: query.location.clone(),
        }
    }

    /// Results without an explicit rank take their 1-based place in the list.
    fn to_status(batch: Batch) -> SearchBatchStatus {
        let groups = batch
            .results
            .into_iter()
            .map(|result| ResultGroup {
                location: result.query.location.unwrap_or_default(),
                entries: result
                    .organic
                    .into_iter()
                    .enumerate()
                    .map(|(index, organic)| RankedResult {
                        url: organic.url.unwrap_or_default(),
                        title: organic.title.unwrap_or_default(),
                        position: organic.position.unwrap_or(index as i32 + 1),
                    })
                    .collect(),
            })
            .collect();

        SearchBatchStatus {
            state: format!("{:?}", batch.state).to_lowercase(),
            terminal: batch.state.is_terminal(),
            groups,
        }
    }
}

#[async_trait]
impl BaseSearchBatchService for ZenserpSearchService {
    async fn submit_batch(&self, label: &str, queries: &[SearchQuery]) -> Result<String> {
        let jobs: Vec<BatchJob> = queries.iter().map(Self::to_batch_job).collect();

        let batch = self
            .client
            .create_batch(label, self.webhook_url.as_deref(), &jobs)
            .await?;

        debug!(batch_id = %batch.id, jobs = jobs.len(), "Zenserp batch created");
        Ok(batch.id)
    }

    async fn batch_status(&self, batch_id: &str) -> Result<SearchBatchStatus> {
        let batch = self.client.get_batch(batch_id).await?;
        Ok(Self::to_status(batch))
    }
}
