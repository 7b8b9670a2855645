// TestDependencies - in-memory implementations for testing
//
// Provides doubles that can be injected into ServerDeps for tests. The
// in-memory store follows the same conditional-write rules as Postgres.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::{
    BaseQueryJobStore, BaseSearchBatchService, BaseUrlAnalyzer, RankedResult, ResultGroup,
    SearchBatchStatus, SearchQuery, ServerDeps, TestNats,
};
use crate::common::nats::{subject_for, IntoNatsPayload};
use crate::config::QueryConfig;
use crate::domains::query_jobs::models::{
    strip_nul, NewQueryItem, NewQueryLocation, PositionHit, ProcessedPage, QueryItem,
    QueryItemLink, QueryJob, QueryLocation,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// In-memory Job Store
// =============================================================================

#[derive(Default)]
struct StoreState {
    jobs: Vec<QueryJob>,
    locations: Vec<QueryLocation>,
    items: Vec<QueryItem>,
    links: Vec<QueryItemLink>,
}

#[derive(Default)]
pub struct InMemoryQueryJobStore {
    state: Mutex<StoreState>,
    fail_item_writes: Mutex<bool>,
}

impl InMemoryQueryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `record_success` and `record_failure` return an error.
    pub fn fail_item_writes(&self, fail: bool) {
        *lock(&self.fail_item_writes) = fail;
    }

    pub fn items(&self, job_id: Uuid) -> Vec<QueryItem> {
        lock(&self.state)
            .items
            .iter()
            .filter(|i| i.query_job_id == job_id)
            .cloned()
            .collect()
    }

    pub fn all_links(&self) -> Vec<QueryItemLink> {
        lock(&self.state).links.clone()
    }

    fn check_item_writes(&self) -> Result<()> {
        if *lock(&self.fail_item_writes) {
            anyhow::bail!("store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl BaseQueryJobStore for InMemoryQueryJobStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create_job(&self, keyword: &str, locations: &[NewQueryLocation]) -> Result<QueryJob> {
        let mut state = lock(&self.state);
        let now = Utc::now();

        let job = QueryJob {
            id: Uuid::new_v4(),
            keyword: keyword.to_string(),
            created_at: now,
            completed_at: None,
            search_batch_id: None,
            search_batch_consumed: false,
        };
        for location in locations {
            state.locations.push(QueryLocation {
                id: Uuid::new_v4(),
                query_job_id: job.id,
                device: location.device.clone(),
                search_engine: location.search_engine.clone(),
                num: location.num,
                country: location.country.clone(),
                location: location.location.clone(),
                created_at: now,
            });
        }
        state.jobs.push(job.clone());

        Ok(job)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<QueryJob>> {
        Ok(lock(&self.state).jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<QueryJob>> {
        let mut jobs = lock(&self.state).jobs.clone();
        jobs.reverse();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool> {
        let mut state = lock(&self.state);
        let before = state.jobs.len();
        state.jobs.retain(|j| j.id != id);
        if state.jobs.len() == before {
            return Ok(false);
        }

        let item_ids: HashSet<Uuid> = state
            .items
            .iter()
            .filter(|i| i.query_job_id == id)
            .map(|i| i.id)
            .collect();
        state.links.retain(|l| !item_ids.contains(&l.query_item_id));
        state.items.retain(|i| i.query_job_id != id);
        state.locations.retain(|l| l.query_job_id != id);
        Ok(true)
    }

    async fn list_locations(&self, job_id: Uuid) -> Result<Vec<QueryLocation>> {
        Ok(lock(&self.state)
            .locations
            .iter()
            .filter(|l| l.query_job_id == job_id)
            .cloned()
            .collect())
    }

    async fn set_search_batch(&self, job_id: Uuid, batch_id: &str) -> Result<bool> {
        let mut state = lock(&self.state);
        match state
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.search_batch_id.is_none())
        {
            Some(job) => {
                job.search_batch_id = Some(batch_id.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_jobs_with_open_batch(&self) -> Result<Vec<QueryJob>> {
        Ok(lock(&self.state)
            .jobs
            .iter()
            .filter(|j| j.search_batch_id.is_some() && !j.search_batch_consumed)
            .cloned()
            .collect())
    }

    async fn mark_batch_consumed(&self, job_id: Uuid) -> Result<()> {
        if let Some(job) = lock(&self.state).jobs.iter_mut().find(|j| j.id == job_id) {
            job.search_batch_consumed = true;
        }
        Ok(())
    }

    async fn create_items(&self, items: &[NewQueryItem]) -> Result<u64> {
        let mut state = lock(&self.state);
        let mut inserted = 0;

        for item in items {
            let exists = state.items.iter().any(|i| {
                i.query_location_id == item.query_location_id
                    && i.position == item.position
                    && i.url == item.url
            });
            if exists {
                continue;
            }
            state.items.push(QueryItem {
                id: Uuid::new_v4(),
                query_job_id: item.query_job_id,
                query_location_id: item.query_location_id,
                position: item.position,
                url: item.url.clone(),
                title: item.title.clone(),
                body: None,
                page_title: None,
                processed_at: None,
                error_processing: false,
                created_at: Utc::now(),
            });
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn list_items_by_url(&self, job_id: Uuid, url: &str) -> Result<Vec<QueryItem>> {
        let mut items: Vec<QueryItem> = lock(&self.state)
            .items
            .iter()
            .filter(|i| i.query_job_id == job_id && i.url == url)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.position, i.created_at));
        Ok(items)
    }

    async fn find_item_by_url(&self, job_id: Uuid, url: &str) -> Result<Option<QueryItem>> {
        let items = self.list_items_by_url(job_id, url).await?;
        Ok(items
            .iter()
            .find(|i| i.body.is_some())
            .or_else(|| items.first())
            .cloned())
    }

    async fn record_success(&self, job_id: Uuid, url: &str, page: &ProcessedPage) -> Result<u64> {
        self.check_item_writes()?;
        let mut state = lock(&self.state);
        let now = Utc::now();

        let mut updated = Vec::new();
        for item in state
            .items
            .iter_mut()
            .filter(|i| i.query_job_id == job_id && i.url == url && i.processed_at.is_none())
        {
            item.body = Some(strip_nul(&page.body));
            item.page_title = page.title.as_deref().map(strip_nul);
            item.processed_at = Some(now);
            item.error_processing = false;
            updated.push(item.id);
        }

        for item_id in &updated {
            for link in &page.links {
                state.links.push(QueryItemLink {
                    id: Uuid::new_v4(),
                    query_item_id: *item_id,
                    text: strip_nul(&link.text),
                    url: link.url.clone(),
                    created_at: now,
                });
            }
        }

        Ok(updated.len() as u64)
    }

    async fn record_failure(&self, job_id: Uuid, url: &str) -> Result<u64> {
        self.check_item_writes()?;
        let mut state = lock(&self.state);
        let now = Utc::now();

        let mut updated = 0;
        for item in state
            .items
            .iter_mut()
            .filter(|i| i.query_job_id == job_id && i.url == url && i.processed_at.is_none())
        {
            item.processed_at = Some(now);
            item.error_processing = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn count_unprocessed(&self, job_id: Uuid) -> Result<i64> {
        Ok(lock(&self.state)
            .items
            .iter()
            .filter(|i| i.query_job_id == job_id && i.processed_at.is_none())
            .count() as i64)
    }

    async fn mark_complete_if_drained(&self, job_id: Uuid) -> Result<bool> {
        let mut state = lock(&self.state);
        let drained = !state
            .items
            .iter()
            .any(|i| i.query_job_id == job_id && i.processed_at.is_none());

        match state
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id && j.completed_at.is_none())
        {
            Some(job) if drained => {
                job.completed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_links(&self, item_id: Uuid) -> Result<Vec<QueryItemLink>> {
        Ok(lock(&self.state)
            .links
            .iter()
            .filter(|l| l.query_item_id == item_id)
            .cloned()
            .collect())
    }

    async fn position_hits(&self, job_id: Uuid, min_locations: i64) -> Result<Vec<PositionHit>> {
        let state = lock(&self.state);

        let mut by_url: HashMap<&str, (Vec<i32>, HashSet<Uuid>)> = HashMap::new();
        for item in state.items.iter().filter(|i| i.query_job_id == job_id) {
            let entry = by_url.entry(item.url.as_str()).or_default();
            entry.0.push(item.position);
            entry.1.insert(item.query_location_id);
        }

        let mut hits: Vec<PositionHit> = by_url
            .into_iter()
            .filter(|(_, (_, locations))| locations.len() as i64 >= min_locations)
            .map(|(url, (positions, locations))| PositionHit {
                url: url.to_string(),
                avg_position: positions.iter().map(|p| *p as f64).sum::<f64>()
                    / positions.len() as f64,
                location_hits_count: locations.len() as i64,
            })
            .collect();
        hits.sort_by(|a, b| {
            a.avg_position
                .total_cmp(&b.avg_position)
                .then_with(|| a.url.cmp(&b.url))
        });

        Ok(hits)
    }
}

// =============================================================================
// Mock Search Batch Service
// =============================================================================

/// Arguments captured from a submit call
#[derive(Debug, Clone)]
pub struct SubmitCall {
    pub label: String,
    pub queries: Vec<SearchQuery>,
}

#[derive(Default)]
pub struct MockSearchBatchService {
    submissions: Mutex<Vec<SubmitCall>>,
    statuses: Mutex<HashMap<String, SearchBatchStatus>>,
    failing_batches: Mutex<HashSet<String>>,
    fail_submit: Mutex<bool>,
}

impl MockSearchBatchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_submit(&self, fail: bool) {
        *lock(&self.fail_submit) = fail;
    }

    pub fn set_status(&self, batch_id: &str, status: SearchBatchStatus) {
        lock(&self.statuses).insert(batch_id.to_string(), status);
    }

    /// Terminal status whose groups hold `(url, title, position)` entries.
    pub fn set_finished(&self, batch_id: &str, groups: Vec<(&str, Vec<(&str, &str, i32)>)>) {
        let groups = groups
            .into_iter()
            .map(|(location, entries)| ResultGroup {
                location: location.to_string(),
                entries: entries
                    .into_iter()
                    .map(|(url, title, position)| RankedResult {
                        url: url.to_string(),
                        title: title.to_string(),
                        position,
                    })
                    .collect(),
            })
            .collect();
        self.set_status(
            batch_id,
            SearchBatchStatus {
                state: "done".to_string(),
                terminal: true,
                groups,
            },
        );
    }

    /// Status lookups for this batch return an error.
    pub fn fail_status(&self, batch_id: &str) {
        lock(&self.failing_batches).insert(batch_id.to_string());
    }

    pub fn submissions(&self) -> Vec<SubmitCall> {
        lock(&self.submissions).clone()
    }
}

#[async_trait]
impl BaseSearchBatchService for MockSearchBatchService {
    async fn submit_batch(&self, label: &str, queries: &[SearchQuery]) -> Result<String> {
        if *lock(&self.fail_submit) {
            anyhow::bail!("search provider unavailable");
        }
        let mut submissions = lock(&self.submissions);
        submissions.push(SubmitCall {
            label: label.to_string(),
            queries: queries.to_vec(),
        });
        Ok(format!("batch-{}", submissions.len()))
    }

    async fn batch_status(&self, batch_id: &str) -> Result<SearchBatchStatus> {
        if lock(&self.failing_batches).contains(batch_id) {
            anyhow::bail!("status lookup failed for {}", batch_id);
        }
        Ok(lock(&self.statuses)
            .get(batch_id)
            .cloned()
            .unwrap_or_else(|| SearchBatchStatus {
                state: "processing".to_string(),
                terminal: false,
                groups: Vec::new(),
            }))
    }
}

// =============================================================================
// Mock URL Analyzer
// =============================================================================

#[derive(Default)]
pub struct MockUrlAnalyzer {
    pages: Mutex<HashMap<String, ProcessedPage>>,
    failing_urls: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockUrlAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, page: ProcessedPage) -> Self {
        self.set_page(url, page);
        self
    }

    pub fn with_failure(self, url: &str) -> Self {
        self.set_failure(url);
        self
    }

    pub fn set_page(&self, url: &str, page: ProcessedPage) {
        lock(&self.pages).insert(url.to_string(), page);
    }

    /// Analysis of this URL returns an error.
    pub fn set_failure(&self, url: &str) {
        lock(&self.failing_urls).insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl BaseUrlAnalyzer for MockUrlAnalyzer {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn analyze(&self, url: &str) -> Result<ProcessedPage> {
        lock(&self.calls).push(url.to_string());

        if lock(&self.failing_urls).contains(url) {
            anyhow::bail!("could not fetch {}", url);
        }
        Ok(lock(&self.pages)
            .get(url)
            .cloned()
            .unwrap_or_else(|| ProcessedPage {
                body: format!("Content of {}", url),
                title: None,
                links: Vec::new(),
            }))
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

pub const TEST_SUBJECT_PREFIX: &str = "test";

pub struct TestDependencies {
    pub store: Arc<InMemoryQueryJobStore>,
    pub nats: Arc<TestNats>,
    pub search: Arc<MockSearchBatchService>,
    pub analyzer: Arc<MockUrlAnalyzer>,
    pub query_config: QueryConfig,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryQueryJobStore::new()),
            nats: Arc::new(TestNats::new()),
            search: Arc::new(MockSearchBatchService::new()),
            analyzer: Arc::new(MockUrlAnalyzer::new()),
            query_config: QueryConfig::default(),
        }
    }

    pub fn mock_analyzer(mut self, analyzer: MockUrlAnalyzer) -> Self {
        self.analyzer = Arc::new(analyzer);
        self
    }

    pub fn query_config(mut self, config: QueryConfig) -> Self {
        self.query_config = config;
        self
    }

    /// Deps wired with every double, including search and analyzer.
    pub fn deps(&self) -> ServerDeps {
        self.deps_without_providers()
            .with_search(self.search.clone())
            .with_analyzer(self.analyzer.clone())
    }

    pub fn deps_without_providers(&self) -> ServerDeps {
        ServerDeps::new(
            self.store.clone(),
            self.nats.clone(),
            TEST_SUBJECT_PREFIX,
            self.query_config.clone(),
        )
    }

    /// Decode everything published as event type `E`.
    pub fn published<E>(&self) -> Vec<E>
    where
        E: IntoNatsPayload + serde::de::DeserializeOwned,
    {
        self.nats
            .decode_all(&subject_for::<E>(TEST_SUBJECT_PREFIX))
            .unwrap_or_default()
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
