//! Messages that move a query job from one stage to the next.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::nats::IntoNatsPayload;

/// A job and its locations were committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryJobCreated {
    pub query_job_id: Uuid,
    pub keyword: String,
}

/// The provider finished the job's search batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBatchCompleted {
    pub query_job_id: Uuid,
    pub batch_id: String,
}

/// A distinct result URL needs analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryJobUrlDiscovered {
    pub query_job_id: Uuid,
    pub url: String,
}

/// Every hit for a URL was moved to terminal (or there were none).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryJobUrlProcessed {
    pub query_job_id: Uuid,
    pub url: String,
}

impl IntoNatsPayload for QueryJobCreated {
    fn query_job_id(&self) -> Uuid {
        self.query_job_id
    }

    fn subject_suffix() -> &'static str {
        "query_job.created"
    }
}

impl IntoNatsPayload for SearchBatchCompleted {
    fn query_job_id(&self) -> Uuid {
        self.query_job_id
    }

    fn subject_suffix() -> &'static str {
        "query_job.search_batch_completed"
    }
}

impl IntoNatsPayload for QueryJobUrlDiscovered {
    fn query_job_id(&self) -> Uuid {
        self.query_job_id
    }

    fn subject_suffix() -> &'static str {
        "query_job.url_discovered"
    }
}

impl IntoNatsPayload for QueryJobUrlProcessed {
    fn query_job_id(&self) -> Uuid {
        self.query_job_id
    }

    fn subject_suffix() -> &'static str {
        "query_job.url_processed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_flat_json() {
        let id = Uuid::new_v4();
        let event = QueryJobUrlDiscovered {
            query_job_id: id,
            url: "https://example.com/".to_string(),
        };

        let value: serde_json::Value = serde_json::from_slice(&event.into_payload().unwrap()).unwrap();

        assert_eq!(value["query_job_id"], id.to_string());
        assert_eq!(value["url"], "https://example.com/");
    }
}
