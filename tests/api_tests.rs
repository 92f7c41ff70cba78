
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use jobplane::api::{router, ApiState, USER_HEADER};
use jobplane::auth::UserAllowList;
use jobplane::config::OrchestratorConfig;
use jobplane::job::JobStatus;
use test_harness::*;

fn app(fx: &Fixture) -> Router {
    router(ApiState {
        orchestrator: fx.orchestrator.clone(),
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn single_job_body(name: &str) -> Value {
    json!({
        "name": name,
        "schedulingPolicy": {"queue": QUEUE},
        "flavour": {"name": FLAVOUR},
        "image": "busybox:1",
        "command": "echo hello",
        "env": {"GREETING": "hi"}
    })
}

#[tokio::test]
async fn test_create_and_get_single_job() {
    let fx = Fixture::new();

    let mut request = post_json("/api/v1/job/single", single_job_body("job1"));
    request
        .headers_mut()
        .insert(USER_HEADER, "alice".parse().unwrap());
    let (status, body) = send(app(&fx), request).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("job-"));

    let (status, body) = send(app(&fx), empty("GET", &format!("/api/v1/job/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["status"], "init");
    assert_eq!(body["userName"], "alice");
    assert_eq!(body["queueId"], QUEUE);
    assert_eq!(body["config"]["kind"], "single");
    assert_eq!(body["config"]["clusterId"], CLUSTER);
    assert_eq!(body["config"]["namespace"], NAMESPACE);
    assert_eq!(body["config"]["priority"], "normal");
    assert_eq!(body["config"]["image"], "busybox:1");
}

#[tokio::test]
async fn test_invalid_priority_is_bad_request() {
    let fx = Fixture::new();
    let mut body = single_job_body("job1");
    body["schedulingPolicy"]["priority"] = json!("urgent");

    let (status, body) = send(app(&fx), post_json("/api/v1/job/single", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
    assert!(body["message"].as_str().unwrap().contains("urgent"));
    assert!(fx.repository.is_empty().await);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let fx = Fixture::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/job/single")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(app(&fx), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ValidationError");
}

#[tokio::test]
async fn test_unsupported_kind_is_bad_request() {
    let fx = Fixture::new();
    let body = json!({"name": "dist", "framework": "mpi", "members": []});

    let (status, body) = send(app(&fx), post_json("/api/v1/job/distributed", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("distributed"));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let fx = Fixture::new();
    let (status, body) = send(app(&fx), empty("GET", "/api/v1/job/job-missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFoundError");
}

#[tokio::test]
async fn test_stop_maps_conflict_and_success() {
    let fx = Fixture::new();
    let done = fx.submit_in("done", JobStatus::Succeeded).await;
    let running = fx.submit_in("running", JobStatus::Running).await;

    let (status, body) = send(app(&fx), empty("PUT", &format!("/api/v1/job/{}/stop", done))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "StateConflictError");

    let (status, _) = send(
        app(&fx),
        empty("PUT", &format!("/api/v1/job/{}/stop", running)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(fx.behavior().ops(), vec!["stop"]);
}

#[tokio::test]
async fn test_delete_maps_runtime_failure_to_bad_gateway() {
    let fx = Fixture::new();
    let id = fx.submit_in("job1", JobStatus::Running).await;
    let uri = format!("/api/v1/job/{}", id);

    fx.behavior().set_failing(true);
    let (status, body) = send(app(&fx), empty("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "RuntimeError");

    fx.behavior().set_failing(false);
    let (status, _) = send(app(&fx), empty("DELETE", &uri)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(app(&fx), empty("GET", &uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_runtime_init_failure_is_service_unavailable() {
    let fx = Fixture::new();
    let id = fx.submit("job1").await;
    fx.factory.set_failing(true);

    let (status, body) = send(app(&fx), empty("DELETE", &format!("/api/v1/job/{}", id))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "RuntimeInitError");
}

#[tokio::test]
async fn test_report_status_then_list_by_queue() {
    let fx = Fixture::new();
    let id = fx.submit("job1").await;
    let _idle = fx.submit("job2").await;

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/v1/job/{}/status", id))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"status": "running", "runtimeInfo": {"container": "abc"}}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(app(&fx), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");

    let uri = format!("/api/v1/job?queue={}&status=running", QUEUE);
    let (status, body) = send(app(&fx), empty("GET", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], id.as_str());
    assert_eq!(jobs[0]["runtimeInfo"]["container"], "abc");
}

#[tokio::test]
async fn test_list_requires_queue_or_run() {
    let fx = Fixture::new();
    let (status, _) = send(app(&fx), empty("GET", "/api/v1/job")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app(&fx), empty("GET", "/api/v1/job?queue=q1&status=bogus")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unlisted_user_is_forbidden() {
    let fx = Fixture::with(
        OrchestratorConfig::default(),
        Arc::new(UserAllowList::new(["root".to_string()])),
    );

    let mut request = post_json("/api/v1/job/single", single_job_body("job1"));
    request
        .headers_mut()
        .insert(USER_HEADER, "mallory".parse().unwrap());
    let (status, body) = send(app(&fx), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "PermissionError");
    assert!(fx.repository.is_empty().await);
}
