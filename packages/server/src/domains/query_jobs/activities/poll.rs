//! Batch completion polling.

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::common::nats::publish_event;
use crate::domains::query_jobs::events::SearchBatchCompleted;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    /// Open batches looked at.
    pub checked: usize,
    /// Batches found finished and handed on.
    pub completed: usize,
    /// Batches whose status could not be read or handed on.
    pub failed: usize,
}

/// Check every open batch once and hand finished ones to the expander.
///
/// The completion event is published before the batch is marked consumed, so
/// a crash in between only causes a duplicate event. A failure on one batch
/// is logged and the scan moves on; the batch stays open for the next pass.
pub async fn poll_search_batches(deps: &ServerDeps) -> Result<PollSummary> {
    let search = deps.search()?;
    let jobs = deps.store.list_jobs_with_open_batch().await?;

    let mut summary = PollSummary::default();

    for job in jobs {
        let Some(batch_id) = job.search_batch_id.clone() else {
            continue;
        };
        summary.checked += 1;

        let status = match search.batch_status(&batch_id).await {
            Ok(status) => status,
            Err(e) => {
                error!(query_job_id = %job.id, batch_id = %batch_id, error = %e, "Failed to check search batch");
                summary.failed += 1;
                continue;
            }
        };

        if !status.terminal {
            debug!(query_job_id = %job.id, batch_id = %batch_id, state = %status.state, "Search batch still running");
            continue;
        }

        let event = SearchBatchCompleted {
            query_job_id: job.id,
            batch_id: batch_id.clone(),
        };
        if let Err(e) = publish_event(&event, &deps.subject_prefix, deps.nats.as_ref()).await {
            error!(query_job_id = %job.id, batch_id = %batch_id, error = %e, "Failed to announce finished batch");
            summary.failed += 1;
            continue;
        }

        if let Err(e) = deps.store.mark_batch_consumed(job.id).await {
            error!(query_job_id = %job.id, batch_id = %batch_id, error = %e, "Failed to mark batch consumed");
            summary.failed += 1;
            continue;
        }

        info!(query_job_id = %job.id, batch_id = %batch_id, "Search batch finished");
        summary.completed += 1;
    }

    Ok(summary)
}
