use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::domains::query_jobs::QueryJobError;

/// Error returned by the JSON routes.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Job(QueryJobError),
}

impl From<QueryJobError> for ApiError {
    fn from(e: QueryJobError) -> Self {
        ApiError::Job(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        match e.downcast::<QueryJobError>() {
            Ok(job_error) => ApiError::Job(job_error),
            Err(e) => ApiError::Job(QueryJobError::Internal(e)),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Job(e) => match e {
                QueryJobError::EmptyKeyword => {
                    json_error(StatusCode::BAD_REQUEST, "bad_request", e.to_string())
                }
                QueryJobError::NotFound(_) => {
                    json_error(StatusCode::NOT_FOUND, "not_found", e.to_string())
                }
                QueryJobError::DependencyUnavailable(_) => {
                    error!(error = %e, "Request needs an unconfigured dependency");
                    json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", e.to_string())
                }
                QueryJobError::Internal(inner) => {
                    error!(error = ?inner, "Request failed");
                    json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "internal server error",
                    )
                }
            },
        }
    }
}
