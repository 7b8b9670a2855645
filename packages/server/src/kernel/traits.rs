// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Stage logic lives in domains/query_jobs/activities and only talks to these.
//
// Naming convention: Base* for trait names (e.g., BaseQueryJobStore)

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domains::query_jobs::models::{
    NewQueryItem, NewQueryLocation, PositionHit, ProcessedPage, QueryItem, QueryItemLink,
    QueryJob, QueryLocation,
};

// =============================================================================
// Job Store Trait
// =============================================================================

/// Persistent state shared by every pipeline stage.
///
/// Every operation that touches shared state is a single set-based statement
/// or one transaction, so concurrent stages never need an application lock.
#[async_trait]
pub trait BaseQueryJobStore: Send + Sync {
    /// Cheap round trip to check the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Insert a job and all of its locations atomically.
    async fn create_job(&self, keyword: &str, locations: &[NewQueryLocation]) -> Result<QueryJob>;

    async fn find_job(&self, id: Uuid) -> Result<Option<QueryJob>>;

    /// Newest first.
    async fn list_jobs(&self) -> Result<Vec<QueryJob>>;

    /// Delete a job with everything it owns. False when it did not exist.
    async fn delete_job(&self, id: Uuid) -> Result<bool>;

    async fn list_locations(&self, job_id: Uuid) -> Result<Vec<QueryLocation>>;

    /// Attach a batch handle if the job has none yet. False when one was already set.
    async fn set_search_batch(&self, job_id: Uuid, batch_id: &str) -> Result<bool>;

    /// Jobs with a submitted batch that has not been handed to the expander.
    async fn list_jobs_with_open_batch(&self) -> Result<Vec<QueryJob>>;

    async fn mark_batch_consumed(&self, job_id: Uuid) -> Result<()>;

    /// Insert hits, skipping ones already stored. Returns how many were new.
    async fn create_items(&self, items: &[NewQueryItem]) -> Result<u64>;

    async fn list_items_by_url(&self, job_id: Uuid, url: &str) -> Result<Vec<QueryItem>>;

    async fn find_item_by_url(&self, job_id: Uuid, url: &str) -> Result<Option<QueryItem>>;

    /// Store a successful analysis on every open hit for the URL, with its links.
    /// Returns how many hits moved to terminal.
    async fn record_success(&self, job_id: Uuid, url: &str, page: &ProcessedPage) -> Result<u64>;

    /// Mark every open hit for the URL terminal with an error.
    async fn record_failure(&self, job_id: Uuid, url: &str) -> Result<u64>;

    async fn count_unprocessed(&self, job_id: Uuid) -> Result<i64>;

    /// Set `completed_at` when no hit is left unprocessed and it is not set yet.
    async fn mark_complete_if_drained(&self, job_id: Uuid) -> Result<bool>;

    async fn list_links(&self, item_id: Uuid) -> Result<Vec<QueryItemLink>>;

    async fn position_hits(&self, job_id: Uuid, min_locations: i64) -> Result<Vec<PositionHit>>;
}

// =============================================================================
// Search Batch Trait
// =============================================================================

/// One search to run inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub device: String,
    pub search_engine: String,
    pub num: i32,
    pub country: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedResult {
    pub url: String,
    pub title: String,
    pub position: i32,
}

/// Results of one query, tagged with the location it ran from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultGroup {
    pub location: String,
    pub entries: Vec<RankedResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchBatchStatus {
    /// Provider state as reported, for logging.
    pub state: String,
    /// Results are final and can be read.
    pub terminal: bool,
    pub groups: Vec<ResultGroup>,
}

#[async_trait]
pub trait BaseSearchBatchService: Send + Sync {
    /// Submit a batch of searches. Returns the provider's batch handle.
    async fn submit_batch(&self, label: &str, queries: &[SearchQuery]) -> Result<String>;

    async fn batch_status(&self, batch_id: &str) -> Result<SearchBatchStatus>;
}

// =============================================================================
// URL Analyzer Trait
// =============================================================================

/// Fetches a page and turns it into stored content.
#[async_trait]
pub trait BaseUrlAnalyzer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn analyze(&self, url: &str) -> Result<ProcessedPage>;
}
