//! Server dependencies for pipeline stages (using traits for testability)
//!
//! Every stage receives `&ServerDeps`. External services sit behind `Base*`
//! traits so tests can swap in the doubles from `test_dependencies`.

use std::sync::Arc;

use crate::config::QueryConfig;
use crate::domains::query_jobs::error::QueryJobError;
use crate::kernel::{BaseQueryJobStore, BaseSearchBatchService, BaseUrlAnalyzer, NatsPublisher};

#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BaseQueryJobStore>,
    pub nats: Arc<dyn NatsPublisher>,
    /// Prepended to every event subject, e.g. `serp`.
    pub subject_prefix: String,
    pub query_config: QueryConfig,
    /// Absent when no search provider key is configured.
    pub search: Option<Arc<dyn BaseSearchBatchService>>,
    /// Absent when the selected URL processor cannot be built.
    pub analyzer: Option<Arc<dyn BaseUrlAnalyzer>>,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn BaseQueryJobStore>,
        nats: Arc<dyn NatsPublisher>,
        subject_prefix: impl Into<String>,
        query_config: QueryConfig,
    ) -> Self {
        Self {
            store,
            nats,
            subject_prefix: subject_prefix.into(),
            query_config,
            search: None,
            analyzer: None,
        }
    }

    pub fn with_search(mut self, search: Arc<dyn BaseSearchBatchService>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn BaseUrlAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn search(&self) -> Result<&dyn BaseSearchBatchService, QueryJobError> {
        self.search
            .as_deref()
            .ok_or(QueryJobError::DependencyUnavailable("search batch provider"))
    }

    pub fn analyzer(&self) -> Result<&dyn BaseUrlAnalyzer, QueryJobError> {
        self.analyzer
            .as_deref()
            .ok_or(QueryJobError::DependencyUnavailable("URL analyzer"))
    }
}
