//! Job completion tracking.

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionCheck {
    /// This many hits are still unprocessed.
    Pending(i64),
    /// This check marked the job complete.
    Completed,
    /// The job was already complete (or is gone).
    AlreadyComplete,
}

/// Mark the job complete if none of its hits are left unprocessed.
///
/// Safe to run any number of times, in any order, from any processor.
pub async fn check_query_job_completion(
    query_job_id: Uuid,
    deps: &ServerDeps,
) -> Result<CompletionCheck> {
    let remaining = deps.store.count_unprocessed(query_job_id).await?;
    if remaining > 0 {
        info!(query_job_id = %query_job_id, remaining = remaining, "Query job still has unprocessed items");
        return Ok(CompletionCheck::Pending(remaining));
    }

    if deps.store.mark_complete_if_drained(query_job_id).await? {
        info!(query_job_id = %query_job_id, "Marked query job as complete");
        Ok(CompletionCheck::Completed)
    } else {
        Ok(CompletionCheck::AlreadyComplete)
    }
}
