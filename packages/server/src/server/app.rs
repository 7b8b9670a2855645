//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::Extension, routing::get, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use zenserp_client::ZenserpClient;

use crate::config::{Config, UrlProcessorKind};
use crate::kernel::{
    BaseUrlAnalyzer, NatsPublisher, PostgresQueryJobStore, ServerDeps, SimpleScraper,
    TextRazorAnalyzer, ZenserpSearchService,
};
use crate::server::routes::{health_handler, query_jobs};
use textrazor_client::TextRazorClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps) -> Router {
    let state = AppState { deps };

    Router::new()
        .route("/health", get(health_handler))
        .merge(query_jobs::router())
        .layer(Extension(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Wire production dependencies from configuration.
///
/// Providers whose keys are missing are left out; stages that need them fail
/// with a dependency-unavailable error instead of at start-up.
pub fn build_deps(
    config: &Config,
    pool: PgPool,
    nats: Arc<dyn NatsPublisher>,
) -> Result<ServerDeps> {
    let store = Arc::new(PostgresQueryJobStore::new(pool));
    let mut deps = ServerDeps::new(
        store,
        nats,
        config.nats_subject_prefix.clone(),
        config.query.clone(),
    );

    match &config.zenserp_api_key {
        Some(key) => {
            let client = ZenserpClient::with_timeout(key.clone(), config.external_call_timeout)
                .context("Failed to create Zenserp client")?;
            deps = deps.with_search(Arc::new(ZenserpSearchService::new(
                client,
                config.zenserp_batch_webhook_url.clone(),
            )));
        }
        None => tracing::warn!("ZENSERP_API_KEY not set; search batches are disabled"),
    }

    let analyzer: Option<Arc<dyn BaseUrlAnalyzer>> = match config.url_processor {
        UrlProcessorKind::TextRazor => match &config.textrazor_api_key {
            Some(key) => {
                let client =
                    TextRazorClient::with_timeout(key.clone(), config.external_call_timeout)
                        .context("Failed to create TextRazor client")?;
                Some(Arc::new(TextRazorAnalyzer::new(client)))
            }
            None => {
                tracing::warn!("TEXTRAZOR_API_KEY not set; URL processing is disabled");
                None
            }
        },
        UrlProcessorKind::Scraper => Some(Arc::new(SimpleScraper::new(
            config.external_call_timeout,
        )?)),
    };
    if let Some(analyzer) = analyzer {
        tracing::info!(analyzer = analyzer.name(), "URL processor configured");
        deps = deps.with_analyzer(analyzer);
    }

    Ok(deps)
}

/// Connect to Postgres and bring the schema up to date.
pub async fn connect_database(database_url: &str) -> Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    Ok(pool)
}
