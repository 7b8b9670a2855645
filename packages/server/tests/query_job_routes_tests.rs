//! HTTP front door tests. The router runs against in-memory doubles, so no
//! containers are needed.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use serp_core::domains::query_jobs::events::{QueryJobCreated, SearchBatchCompleted};
use serp_core::domains::query_jobs::models::NewQueryItem;
use serp_core::kernel::{BaseQueryJobStore, TestDependencies};
use serp_core::server::build_app;
use tower::ServiceExt;
use uuid::Uuid;

fn app(test_deps: &TestDependencies) -> Router {
    build_app(test_deps.deps())
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn create_query_job_returns_id_and_publishes_created() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(
        app(&test_deps),
        post_json("/query-jobs", json!({ "keyword": "  standing desk " })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let id: Uuid = serde_json::from_value(body["query_job_id"].clone()).unwrap();

    let job = test_deps.store.find_job(id).await.unwrap().unwrap();
    assert_eq!(job.keyword, "standing desk");

    let created = test_deps.published::<QueryJobCreated>();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].query_job_id, id);
}

#[tokio::test]
async fn create_query_job_rejects_blank_keyword() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(
        app(&test_deps),
        post_json("/query-jobs", json!({ "keyword": "   " })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(test_deps.published::<QueryJobCreated>().is_empty());
}

#[tokio::test]
async fn create_query_job_rejects_malformed_body() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(
        app(&test_deps),
        post_json("/query-jobs", json!({ "term": "desk" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn get_and_list_query_jobs() {
    let test_deps = TestDependencies::new();
    let (_, body) = send(
        app(&test_deps),
        post_json("/query-jobs", json!({ "keyword": "desk" })),
    )
    .await;
    let id = body["query_job_id"].as_str().unwrap().to_string();

    let (status, job) = send(app(&test_deps), get(&format!("/query-jobs/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["keyword"], "desk");
    assert_eq!(job["is_complete"], false);

    let (status, jobs) = send(app(&test_deps), get("/query-jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(jobs.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_query_job_is_not_found() {
    let test_deps = TestDependencies::new();
    let id = Uuid::new_v4();

    let (status, _) = send(app(&test_deps), get(&format!("/query-jobs/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/query-jobs/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(&test_deps), request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        app(&test_deps),
        get(&format!("/query-jobs/{}/position-hits", id)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_query_job_removes_it() {
    let test_deps = TestDependencies::new();
    let job = test_deps.store.create_job("desk", &[]).await.unwrap();

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/query-jobs/{}", job.id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&test_deps), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "deleted");
    assert!(test_deps.store.find_job(job.id).await.unwrap().is_none());
}

#[tokio::test]
async fn url_info_requires_url_and_known_result() {
    let test_deps = TestDependencies::new();
    let job = test_deps
        .store
        .create_job("desk", &test_deps.query_config.new_locations())
        .await
        .unwrap();
    let location = test_deps.store.list_locations(job.id).await.unwrap()[0].id;
    test_deps
        .store
        .create_items(&[NewQueryItem {
            query_job_id: job.id,
            query_location_id: location,
            position: 2,
            url: "https://a.example/".to_string(),
            title: "A".to_string(),
        }])
        .await
        .unwrap();

    let (status, _) = send(
        app(&test_deps),
        get(&format!("/query-jobs/{}/url-info", job.id)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app(&test_deps),
        get(&format!(
            "/query-jobs/{}/url-info?url=https%3A%2F%2Fb.example%2F",
            job.id
        )),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, info) = send(
        app(&test_deps),
        get(&format!(
            "/query-jobs/{}/url-info?url=https%3A%2F%2Fa.example%2F",
            job.id
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["url"], "https://a.example/");
    assert_eq!(info["title"], "A");
    assert!(info["body"].is_null());
}

#[tokio::test]
async fn webhook_runs_a_poll_pass() {
    let test_deps = TestDependencies::new();
    let job = test_deps.store.create_job("desk", &[]).await.unwrap();
    test_deps
        .store
        .set_search_batch(job.id, "batch-1")
        .await
        .unwrap();
    test_deps.search.set_finished("batch-1", vec![]);

    let (status, summary) = send(
        app(&test_deps),
        post_json("/webhooks/search-batch", json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["checked"], 1);
    assert_eq!(summary["completed"], 1);
    assert_eq!(summary["failed"], 0);

    let completed = test_deps.published::<SearchBatchCompleted>();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].batch_id, "batch-1");
}

#[tokio::test]
async fn health_reports_store_status() {
    let test_deps = TestDependencies::new();

    let (status, body) = send(app(&test_deps), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "ok");
}
