use serde::{Deserialize, Serialize};

/// One search inside a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchJob {
    #[serde(rename = "q")]
    pub query: String,
    pub num: String,
    pub search_engine: String,
    pub device: String,
    #[serde(rename = "gl")]
    pub country: String,
    pub location: String,
}

/// Request body for creating a batch.
#[derive(Debug, Clone, Serialize)]
pub struct CreateBatchRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<&'a str>,
    pub jobs: &'a [BatchJob],
}

/// Batch lifecycle as reported by Zenserp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Created,
    Processing,
    Done,
    Notified,
    #[serde(other)]
    Unknown,
}

impl BatchState {
    /// Results are available once the batch is done; `notified` means the
    /// webhook has fired as well.
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Done | BatchState::Notified)
    }
}

/// Batch metadata and, once finished, its results.
#[derive(Debug, Clone, Deserialize)]
pub struct Batch {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub state: BatchState,
    #[serde(default)]
    pub results: Vec<BatchJobResult>,
}

/// Results of one job within a batch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchJobResult {
    #[serde(default)]
    pub query: ResultQuery,
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

/// Echo of the parameters a job ran with.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
}

/// A single organic search result.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_finished_batch() {
        let json = r#"{
            "id": "b-123",
            "name": "job: coffee",
            "state": "notified",
            "results": [
                {
                    "query": {"q": "coffee", "location": "Kingfield,Maine,United States"},
                    "organic": [
                        {"position": 1, "title": "Coffee", "url": "https://coffee.example"},
                        {"position": 2, "title": "Local pack"}
                    ]
                }
            ]
        }"#;

        let batch: Batch = serde_json::from_str(json).unwrap();

        assert_eq!(batch.state, BatchState::Notified);
        assert!(batch.state.is_terminal());
        assert_eq!(batch.results.len(), 1);
        assert_eq!(
            batch.results[0].query.location.as_deref(),
            Some("Kingfield,Maine,United States")
        );
        assert_eq!(batch.results[0].organic[1].url, None);
    }

    #[test]
    fn test_unknown_state_is_not_terminal() {
        let batch: Batch =
            serde_json::from_str(r#"{"id": "b-1", "state": "queued_for_review"}"#).unwrap();

        assert_eq!(batch.state, BatchState::Unknown);
        assert!(!batch.state.is_terminal());
        assert!(batch.results.is_empty());
    }

    #[test]
    fn test_batch_job_uses_api_field_names() {
        let job = BatchJob {
            query: "coffee".into(),
            num: "100".into(),
            search_engine: "google.com".into(),
            device: "desktop".into(),
            country: "US".into(),
            location: "Austin County,Texas,United States".into(),
        };

        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["q"], "coffee");
        assert_eq!(value["gl"], "US");
        assert!(value.get("query").is_none());
    }
}
