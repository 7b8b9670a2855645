//! Fan-out of batch results into per-location hits and per-URL work.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use super::check_query_job_completion;
use crate::common::nats::publish_event;
use crate::domains::query_jobs::events::{QueryJobUrlDiscovered, SearchBatchCompleted};
use crate::domains::query_jobs::models::NewQueryItem;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandSummary {
    /// Hits written by this call. Zero on a full redelivery.
    pub items_created: u64,
    /// Distinct URLs announced for processing.
    pub urls: Vec<String>,
}

/// Turn a finished batch into one hit per (location, result) and one
/// discovery event per distinct URL.
///
/// Result groups are matched to the job's locations by location name. Groups
/// that match no location and results without a URL are skipped. Re-running
/// with the same batch stores nothing new but announces the URLs again.
pub async fn expand_search_results(
    event: &SearchBatchCompleted,
    deps: &ServerDeps,
) -> Result<ExpandSummary> {
    let search = deps.search()?;
    let job_id = event.query_job_id;

    let locations = deps.store.list_locations(job_id).await?;
    let location_ids: HashMap<&str, _> = locations
        .iter()
        .map(|l| (l.location.as_str(), l.id))
        .collect();

    let status = search
        .batch_status(&event.batch_id)
        .await
        .context("fetching batch results")?;
    if !status.terminal {
        anyhow::bail!(
            "batch {} for query job {} is not finished (state {})",
            event.batch_id,
            job_id,
            status.state
        );
    }

    let mut items = Vec::new();
    let mut urls = Vec::new();
    let mut seen = HashSet::new();

    for group in &status.groups {
        let Some(location_id) = location_ids.get(group.location.as_str()) else {
            warn!(query_job_id = %job_id, location = %group.location, "Result group matches no location");
            continue;
        };

        for entry in &group.entries {
            let url = entry.url.trim();
            if url.is_empty() {
                continue;
            }

            items.push(NewQueryItem {
                query_job_id: job_id,
                query_location_id: *location_id,
                position: entry.position,
                url: url.to_string(),
                title: entry.title.clone(),
            });
            if seen.insert(url.to_string()) {
                urls.push(url.to_string());
            }
        }
    }

    let items_created = deps.store.create_items(&items).await?;

    info!(
        query_job_id = %job_id,
        items = items.len(),
        items_created = items_created,
        urls = urls.len(),
        "Expanded search results"
    );

    for url in &urls {
        publish_event(
            &QueryJobUrlDiscovered {
                query_job_id: job_id,
                url: url.clone(),
            },
            &deps.subject_prefix,
            deps.nats.as_ref(),
        )
        .await?;
    }

    // Nothing will ever report a processed URL, so finish the job here.
    if urls.is_empty() {
        check_query_job_completion(job_id, deps).await?;
    }

    Ok(ExpandSummary {
        items_created,
        urls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;
    use crate::kernel::{BaseQueryJobStore, TestDependencies};

    const MAINE: &str = "Kingfield,Maine,United States";
    const TEXAS: &str = "Austin County,Texas,United States";

    fn two_locations() -> TestDependencies {
        TestDependencies::new().query_config(QueryConfig {
            locations: vec![MAINE.to_string(), TEXAS.to_string()],
            ..QueryConfig::default()
        })
    }

    async fn setup(test_deps: &TestDependencies) -> SearchBatchCompleted {
        let locations = test_deps.query_config.new_locations();
        let job = test_deps.store.create_job("coffee", &locations).await.unwrap();
        test_deps.store.set_search_batch(job.id, "b-1").await.unwrap();
        SearchBatchCompleted {
            query_job_id: job.id,
            batch_id: "b-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_one_item_per_hit_and_one_event_per_url() {
        let test_deps = two_locations();
        let event = setup(&test_deps).await;
        test_deps.search.set_finished(
            "b-1",
            vec![
                (MAINE, vec![("https://a.example", "A", 1), ("https://b.example", "B", 2)]),
                (TEXAS, vec![("https://b.example", "B", 1), ("https://c.example", "C", 2)]),
            ],
        );

        let summary = expand_search_results(&event, &test_deps.deps()).await.unwrap();

        assert_eq!(summary.items_created, 4);
        assert_eq!(
            summary.urls,
            vec!["https://a.example", "https://b.example", "https://c.example"]
        );
        let discovered = test_deps.published::<QueryJobUrlDiscovered>();
        assert_eq!(discovered.len(), 3);
        assert!(discovered.iter().all(|e| e.query_job_id == event.query_job_id));
        assert_eq!(test_deps.store.count_unprocessed(event.query_job_id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_blank_urls_and_unknown_locations_are_skipped() {
        let test_deps = two_locations();
        let event = setup(&test_deps).await;
        test_deps.search.set_finished(
            "b-1",
            vec![
                (MAINE, vec![("", "Local pack", 1), ("https://a.example", "A", 2)]),
                ("Nowhere,Oregon,United States", vec![("https://z.example", "Z", 1)]),
            ],
        );

        let summary = expand_search_results(&event, &test_deps.deps()).await.unwrap();

        assert_eq!(summary.items_created, 1);
        assert_eq!(summary.urls, vec!["https://a.example"]);
    }

    #[tokio::test]
    async fn test_redelivery_stores_nothing_new() {
        let test_deps = two_locations();
        let event = setup(&test_deps).await;
        test_deps
            .search
            .set_finished("b-1", vec![(MAINE, vec![("https://a.example", "A", 1)])]);
        let deps = test_deps.deps();

        expand_search_results(&event, &deps).await.unwrap();
        let second = expand_search_results(&event, &deps).await.unwrap();

        assert_eq!(second.items_created, 0);
        assert_eq!(test_deps.store.items(event.query_job_id).len(), 1);
    }

    #[tokio::test]
    async fn test_no_urls_completes_job() {
        let test_deps = two_locations();
        let event = setup(&test_deps).await;
        test_deps.search.set_finished("b-1", vec![(MAINE, vec![])]);

        let summary = expand_search_results(&event, &test_deps.deps()).await.unwrap();

        assert!(summary.urls.is_empty());
        let job = test_deps.store.find_job(event.query_job_id).await.unwrap().unwrap();
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_unfinished_batch_is_an_error() {
        let test_deps = two_locations();
        let event = setup(&test_deps).await;

        let result = expand_search_results(&event, &test_deps.deps()).await;

        assert!(result.is_err());
        assert!(test_deps.store.items(event.query_job_id).is_empty());
    }
}
