//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! ```text
//! Scheduler (BATCH_POLL_SCHEDULE, every minute by default)
//!     │
//!     └─► poll_search_batches()
//!             └─► For each finished batch → publish SearchBatchCompleted
//! ```

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::query_jobs::activities::poll_search_batches;
use crate::kernel::ServerDeps;

/// Start the batch poller on `schedule` (six-field cron, seconds first).
pub async fn start_scheduler(deps: ServerDeps, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let poll_job = Job::new_async(schedule, move |_uuid, _lock| {
        let deps = deps.clone();
        Box::pin(async move {
            match poll_search_batches(&deps).await {
                Ok(summary) if summary.checked > 0 => tracing::info!(
                    checked = summary.checked,
                    completed = summary.completed,
                    failed = summary.failed,
                    "Polled search batches"
                ),
                Ok(_) => tracing::debug!("No open search batches"),
                Err(e) => tracing::error!("Search batch poll failed: {}", e),
            }
        })
    })?;

    scheduler.add(poll_job).await?;
    scheduler.start().await?;

    tracing::info!(schedule = %schedule, "Scheduled tasks started (search batch poller)");
    Ok(scheduler)
}
