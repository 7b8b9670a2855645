use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::query_jobs::models::QueryJob;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQueryJobRequest {
    pub keyword: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQueryJobResponse {
    pub query_job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteQueryJobResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlInfoQuery {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryJobData {
    pub id: Uuid,
    pub keyword: String,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub search_batch_id: Option<String>,
    pub is_complete: bool,
}

impl From<QueryJob> for QueryJobData {
    fn from(job: QueryJob) -> Self {
        Self {
            is_complete: job.is_complete(),
            id: job.id,
            keyword: job.keyword,
            created_at: job.created_at.to_rfc3339(),
            completed_at: job.completed_at.map(|t| t.to_rfc3339()),
            search_batch_id: job.search_batch_id,
        }
    }
}
