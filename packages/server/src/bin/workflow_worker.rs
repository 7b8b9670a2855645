//! Pipeline worker
//!
//! Runs the event-driven stages as JetStream consumers plus the cron-driven
//! search batch poller.

use std::sync::Arc;

use anyhow::{Context, Result};
use serp_core::kernel::scheduled_tasks::start_scheduler;
use serp_core::kernel::{EventWorker, JetStreamPublisher};
use serp_core::server::{build_deps, connect_database};
use serp_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,serp_core=debug,sqlx=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting pipeline worker");

    let config = Config::from_env().context("Failed to load configuration")?;
    let pool = connect_database(&config.database_url).await?;

    let nats_client = async_nats::connect(&config.nats_url)
        .await
        .context("Failed to connect to NATS")?;
    let nats = Arc::new(JetStreamPublisher::new(nats_client.clone()));

    let deps = build_deps(&config, pool, nats)?;

    let worker = EventWorker::new(nats_client, config.nats_stream.clone(), deps.clone());
    // Stream must exist before the poller publishes into it
    worker.ensure_stream().await?;

    let mut scheduler = start_scheduler(deps, &config.batch_poll_schedule).await?;

    let result = tokio::select! {
        result = worker.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            Ok(())
        }
    };

    scheduler.shutdown().await?;
    result
}
