//! Job initiation.

use tracing::info;

use crate::common::nats::publish_event;
use crate::domains::query_jobs::error::QueryJobError;
use crate::domains::query_jobs::events::QueryJobCreated;
use crate::domains::query_jobs::models::QueryJob;
use crate::kernel::ServerDeps;

/// Create a job for `keyword` with one location per configured origin, then
/// announce it.
///
/// The job and its locations are committed together before the event is
/// published. If publishing fails the job stays stored but nothing downstream
/// will pick it up, and the caller gets an error.
pub async fn create_query_job(keyword: &str, deps: &ServerDeps) -> Result<QueryJob, QueryJobError> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(QueryJobError::EmptyKeyword);
    }

    let locations = deps.query_config.new_locations();
    let job = deps.store.create_job(keyword, &locations).await?;

    info!(
        query_job_id = %job.id,
        keyword = %job.keyword,
        locations = locations.len(),
        "Created query job"
    );

    publish_event(
        &QueryJobCreated {
            query_job_id: job.id,
            keyword: job.keyword.clone(),
        },
        &deps.subject_prefix,
        deps.nats.as_ref(),
    )
    .await?;

    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;
    use crate::kernel::{BaseQueryJobStore, TestDependencies};

    #[tokio::test]
    async fn test_creates_job_with_configured_locations() {
        let test_deps = TestDependencies::new();
        let deps = test_deps.deps();

        let job = create_query_job("  coffee roasters ", &deps).await.unwrap();

        assert_eq!(job.keyword, "coffee roasters");
        assert!(job.completed_at.is_none());
        assert!(job.search_batch_id.is_none());

        let locations = test_deps.store.list_locations(job.id).await.unwrap();
        assert_eq!(locations.len(), 5);
        assert!(locations.iter().all(|l| l.device == "desktop" && l.num == 100));

        let events = test_deps.published::<QueryJobCreated>();
        assert_eq!(
            events,
            vec![QueryJobCreated {
                query_job_id: job.id,
                keyword: "coffee roasters".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_uses_injected_location_set() {
        let test_deps = TestDependencies::new().query_config(QueryConfig {
            locations: vec!["Kingfield,Maine,United States".to_string()],
            ..QueryConfig::default()
        });

        let job = create_query_job("coffee", &test_deps.deps()).await.unwrap();

        let locations = test_deps.store.list_locations(job.id).await.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].location, "Kingfield,Maine,United States");
    }

    #[tokio::test]
    async fn test_blank_keyword_is_rejected_without_side_effects() {
        let test_deps = TestDependencies::new();

        let result = create_query_job("   ", &test_deps.deps()).await;

        assert!(matches!(result, Err(QueryJobError::EmptyKeyword)));
        assert!(test_deps.store.list_jobs().await.unwrap().is_empty());
        assert_eq!(test_deps.nats.publish_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let test_deps = TestDependencies::new();
        test_deps.nats.fail_publishes(true);

        let result = create_query_job("coffee", &test_deps.deps()).await;

        assert!(matches!(result, Err(QueryJobError::Internal(_))));
    }
}
