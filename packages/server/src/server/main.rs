// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use serp_core::kernel::JetStreamPublisher;
use serp_core::server::{build_app, build_deps, connect_database};
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
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting competitive analysis API");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    let pool = connect_database(&config.database_url).await?;

    tracing::info!(url = %config.nats_url, "Connecting to NATS...");
    let nats_client = async_nats::connect(&config.nats_url)
        .await
        .context("Failed to connect to NATS")?;
    let nats = Arc::new(JetStreamPublisher::new(nats_client));
    // Job creation publishes into this stream
    nats.ensure_stream(&config.nats_stream, &config.nats_subject_prefix)
        .await?;

    let deps = build_deps(&config, pool, nats)?;
    let app = build_app(deps);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
