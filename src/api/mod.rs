use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::context::RequestContext;
use crate::error::{ErrorKind, JobPlaneError};
use crate::job::request::{
    CreateDisJobRequest, CreateJobResponse, CreateSingleJobRequest, CreateWfJobRequest,
};
use crate::job::{Job, JobStatus};
use crate::orchestrator::JobOrchestrator;

/// Header carrying the calling subject.
pub const USER_HEADER: &str = "x-user-name";

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<JobOrchestrator>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Wraps a domain error so handlers can return it with `?`.
pub struct ApiError(JobPlaneError);

impl From<JobPlaneError> for ApiError {
    fn from(e: JobPlaneError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(JobPlaneError::Validation(rejection.body_text()))
    }
}

pub fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Permission => StatusCode::FORBIDDEN,
        ErrorKind::StateConflict => StatusCode::CONFLICT,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Runtime => StatusCode::BAD_GATEWAY,
        ErrorKind::RuntimeInit => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        (
            status_code(kind),
            Json(ErrorBody {
                error: kind.to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListQuery {
    queue: Option<String>,
    /// Comma-separated status labels.
    status: Option<String>,
    run: Option<String>,
    job: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StatusReport {
    status: Option<JobStatus>,
    runtime_info: Option<serde_json::Value>,
    message: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    id: String,
    status: JobStatus,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    jobs: Vec<Job>,
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(RequestContext::new)
        .unwrap_or_default()
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/job", get(list_jobs_handler))
        .route("/api/v1/job/single", post(create_single_handler))
        .route("/api/v1/job/distributed", post(create_distributed_handler))
        .route("/api/v1/job/workflow", post(create_workflow_handler))
        .route(
            "/api/v1/job/:id",
            get(get_job_handler).delete(delete_job_handler),
        )
        .route("/api/v1/job/:id/stop", put(stop_job_handler))
        .route("/api/v1/job/:id/status", put(report_status_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve the API until `shutdown` is cancelled, then drain in-flight requests.
pub async fn run_api(
    addr: SocketAddr,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!(addr = %addr, error = %e, "Failed to bind API server");
        e
    })?;
    tracing::info!(addr = %addr, "Starting API server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn create_single_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<CreateSingleJobRequest>, JsonRejection>,
) -> ApiResult<Json<CreateJobResponse>> {
    let Json(request) = payload?;
    let ctx = request_context(&headers);
    Ok(Json(state.orchestrator.create_single_job(&ctx, request).await?))
}

async fn create_distributed_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<CreateDisJobRequest>, JsonRejection>,
) -> ApiResult<Json<CreateJobResponse>> {
    let Json(request) = payload?;
    let ctx = request_context(&headers);
    Ok(Json(
        state
            .orchestrator
            .create_distributed_job(&ctx, &request)
            .await?,
    ))
}

async fn create_workflow_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<CreateWfJobRequest>, JsonRejection>,
) -> ApiResult<Json<CreateJobResponse>> {
    let Json(request) = payload?;
    let ctx = request_context(&headers);
    Ok(Json(
        state.orchestrator.create_workflow_job(&ctx, &request).await?,
    ))
}

async fn get_job_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let ctx = request_context(&headers);
    Ok(Json(state.orchestrator.get_job(&ctx, &id).await?))
}

async fn stop_job_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let ctx = request_context(&headers);
    state.orchestrator.stop_job(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_job_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let ctx = request_context(&headers);
    state.orchestrator.delete_job(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn report_status_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: std::result::Result<Json<StatusReport>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(report) = payload?;
    let ctx = request_context(&headers);
    let status = state
        .orchestrator
        .report_status(&ctx, &id, report.status, report.runtime_info, &report.message)
        .await?;
    Ok(Json(StatusResponse { id, status }))
}

async fn list_jobs_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let ctx = request_context(&headers);

    let jobs = match (query.queue, query.run) {
        (Some(queue), None) => {
            let statuses = parse_statuses(query.status.as_deref())?;
            state
                .orchestrator
                .list_queue_jobs(&ctx, &queue, &statuses)
                .await?
        }
        (None, Some(run)) => {
            state
                .orchestrator
                .list_run_jobs(&ctx, &run, query.job.as_deref())
                .await?
        }
        _ => {
            return Err(JobPlaneError::Validation(
                "exactly one of queue or run must be given".to_string(),
            )
            .into())
        }
    };
    Ok(Json(ListResponse { jobs }))
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<JobStatus>, JobPlaneError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<JobStatus>().map_err(JobPlaneError::Validation))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_distinct_code() {
        assert_eq!(status_code(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(ErrorKind::StateConflict), StatusCode::CONFLICT);
        assert_eq!(status_code(ErrorKind::Runtime), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_code(ErrorKind::RuntimeInit),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn subject_defaults_to_root() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_context(&headers).subject, "root");

        headers.insert(USER_HEADER, "alice".parse().unwrap());
        assert_eq!(request_context(&headers).subject, "alice");
    }

    #[test]
    fn statuses_parse_from_comma_list() {
        assert_eq!(
            parse_statuses(Some("pending, running")).unwrap(),
            vec![JobStatus::Pending, JobStatus::Running]
        );
        assert!(parse_statuses(None).unwrap().is_empty());
        assert!(parse_statuses(Some("bogus")).is_err());
    }
}
