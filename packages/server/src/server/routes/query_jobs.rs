use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use super::errors::ApiError;
use crate::domains::query_jobs::activities::{
    create_query_job, get_position_hits, get_url_info, poll_search_batches, PollSummary,
};
use crate::domains::query_jobs::data::{
    CreateQueryJobRequest, CreateQueryJobResponse, DeleteQueryJobResponse, QueryJobData,
    UrlInfoQuery,
};
use crate::domains::query_jobs::models::{PositionHit, UrlInfo};
use crate::domains::query_jobs::QueryJobError;
use crate::server::app::AppState;

pub fn router() -> Router {
    Router::new()
        .route("/query-jobs", post(create_query_job_handler).get(list_query_jobs))
        .route("/query-jobs/:id", get(get_query_job).delete(delete_query_job))
        .route("/query-jobs/:id/position-hits", get(position_hits))
        .route("/query-jobs/:id/url-info", get(url_info))
        .route("/webhooks/search-batch", post(search_batch_webhook))
}

pub async fn create_query_job_handler(
    Extension(state): Extension<AppState>,
    body: Result<Json<CreateQueryJobRequest>, JsonRejection>,
) -> Result<Json<CreateQueryJobResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let job = create_query_job(&request.keyword, &state.deps).await?;

    Ok(Json(CreateQueryJobResponse {
        query_job_id: job.id,
    }))
}

pub async fn list_query_jobs(
    Extension(state): Extension<AppState>,
) -> Result<Json<Vec<QueryJobData>>, ApiError> {
    let jobs = state.deps.store.list_jobs().await?;
    Ok(Json(jobs.into_iter().map(QueryJobData::from).collect()))
}

pub async fn get_query_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueryJobData>, ApiError> {
    let job = state
        .deps
        .store
        .find_job(id)
        .await?
        .ok_or(QueryJobError::NotFound(id))?;
    Ok(Json(job.into()))
}

pub async fn delete_query_job(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteQueryJobResponse>, ApiError> {
    if !state.deps.store.delete_job(id).await? {
        return Err(QueryJobError::NotFound(id).into());
    }
    Ok(Json(DeleteQueryJobResponse {
        message: "deleted".to_string(),
    }))
}

pub async fn position_hits(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PositionHit>>, ApiError> {
    Ok(Json(get_position_hits(id, &state.deps).await?))
}

pub async fn url_info(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<UrlInfoQuery>,
) -> Result<Json<UrlInfo>, ApiError> {
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("url query parameter is required".to_string()))?;

    get_url_info(id, &url, &state.deps)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no result for {} in query job {}", url, id)))
}

/// Called by the search provider when a batch finishes. Runs one poll pass
/// over every open batch.
pub async fn search_batch_webhook(
    Extension(state): Extension<AppState>,
) -> Result<Json<PollSummary>, ApiError> {
    Ok(Json(poll_search_batches(&state.deps).await?))
}
