//! Batch search dispatch.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::domains::query_jobs::events::QueryJobCreated;
use crate::kernel::{SearchQuery, ServerDeps};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Submitted { batch_id: String },
    /// The job already had a batch; nothing was submitted.
    AlreadyDispatched { batch_id: String },
}

/// Submit one search per job location as a single provider batch and store
/// the returned handle on the job.
///
/// A redelivered creation event finds the handle already set and does
/// nothing. Submission errors leave the job without a handle so a redelivery
/// can try again.
pub async fn dispatch_search_batch(
    event: &QueryJobCreated,
    deps: &ServerDeps,
) -> Result<DispatchOutcome> {
    let job = deps
        .store
        .find_job(event.query_job_id)
        .await?
        .with_context(|| format!("query job {} not found", event.query_job_id))?;

    if let Some(batch_id) = job.search_batch_id {
        info!(query_job_id = %job.id, batch_id = %batch_id, "Search batch already dispatched");
        return Ok(DispatchOutcome::AlreadyDispatched { batch_id });
    }

    let search = deps.search()?;
    let locations = deps.store.list_locations(job.id).await?;

    let queries: Vec<SearchQuery> = locations
        .into_iter()
        .map(|location| SearchQuery {
            query: job.keyword.clone(),
            device: location.device,
            search_engine: location.search_engine,
            num: location.num,
            country: location.country,
            location: location.location,
        })
        .collect();

    let label = format!("{}: {}", job.id, job.keyword);
    let batch_id = search
        .submit_batch(&label, &queries)
        .await
        .context("submitting search batch")?;

    if !deps.store.set_search_batch(job.id, &batch_id).await? {
        // Another delivery won the race; its batch is the one that counts.
        warn!(query_job_id = %job.id, batch_id = %batch_id, "Orphaned duplicate search batch");
        let current = deps
            .store
            .find_job(job.id)
            .await?
            .and_then(|j| j.search_batch_id)
            .unwrap_or(batch_id);
        return Ok(DispatchOutcome::AlreadyDispatched { batch_id: current });
    }

    info!(
        query_job_id = %job.id,
        batch_id = %batch_id,
        queries = queries.len(),
        "Dispatched search batch"
    );

    Ok(DispatchOutcome::Submitted { batch_id })
}
