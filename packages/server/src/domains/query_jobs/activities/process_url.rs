//! Per-URL analysis.

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::common::nats::publish_event;
use crate::domains::query_jobs::events::{QueryJobUrlDiscovered, QueryJobUrlProcessed};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlOutcome {
    /// Analysis succeeded; this many hits got the content.
    Processed(u64),
    /// Analysis failed; this many hits were marked as errored.
    Failed(u64),
    /// No hits stored for the URL.
    NoItems,
}

/// Analyze a discovered URL once and store the result on every hit for it.
///
/// An analysis failure is not an error here: the hits are marked as failed
/// and the pipeline moves on. Storage and publish failures are errors and
/// rely on redelivery. A processed event is published in every non-error
/// case, including when no hits exist.
pub async fn process_query_job_url(
    event: &QueryJobUrlDiscovered,
    deps: &ServerDeps,
) -> Result<UrlOutcome> {
    let job_id = event.query_job_id;
    let url = event.url.as_str();

    let items = deps.store.list_items_by_url(job_id, url).await?;

    let outcome = if items.is_empty() {
        warn!(query_job_id = %job_id, url = %url, "No query items for URL");
        UrlOutcome::NoItems
    } else if items.iter().all(|i| i.is_processed()) {
        // Redelivery after a successful write
        info!(query_job_id = %job_id, url = %url, "URL already processed");
        UrlOutcome::Processed(0)
    } else {
        let analyzer = deps.analyzer()?;
        match analyzer.analyze(url).await {
            Ok(page) => {
                let updated = deps
                    .store
                    .record_success(job_id, url, &page)
                    .await
                    .context("storing analyzed page")?;
                info!(
                    query_job_id = %job_id,
                    url = %url,
                    analyzer = analyzer.name(),
                    items = updated,
                    links = page.links.len(),
                    "Processed URL"
                );
                UrlOutcome::Processed(updated)
            }
            Err(e) => {
                error!(
                    query_job_id = %job_id,
                    url = %url,
                    analyzer = analyzer.name(),
                    error = %e,
                    "Failed to analyze URL"
                );
                let updated = deps
                    .store
                    .record_failure(job_id, url)
                    .await
                    .context("storing analysis failure")?;
                UrlOutcome::Failed(updated)
            }
        }
    };

    publish_event(
        &QueryJobUrlProcessed {
            query_job_id: job_id,
            url: url.to_string(),
        },
        &deps.subject_prefix,
        deps.nats.as_ref(),
    )
    .await?;

    Ok(outcome)
}
