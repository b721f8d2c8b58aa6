//! HTTP surface: job submission, polling, export, follow-up questions.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use prospector_core::{
    AppConfig, EvidenceAggregator, FollowupEngine, GenerationProvider, InMemoryJobStore, Job,
    JobError, JobKind,
    JobStatus, JobStore, OpenAiCompatProvider, ProspectorError, ResearchPipeline, SearchClient,
    SearchQuery, SearxngClient, export,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

/// Shared application state behind every handler.
pub struct AppState {
    pub config: AppConfig,
    pub llm: Arc<OpenAiCompatProvider>,
    pub store: Arc<dyn JobStore>,
    pub pipeline: Arc<ResearchPipeline>,
    pub followup: Arc<FollowupEngine>,
    pub search: Arc<SearchClient>,
}

pub type SharedState = Arc<AppState>;

/// Wire the full application state from configuration.
pub fn build_state(config: AppConfig) -> anyhow::Result<SharedState> {
    let llm = Arc::new(OpenAiCompatProvider::new(&config.llm)?);
    let searxng = Arc::new(SearxngClient::new(
        config.search.base_url.clone(),
        config.search.timeout_secs,
    )?);
    let search = Arc::new(SearchClient::new(searxng, config.search.cache_dir.clone()));
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());

    let aggregator = EvidenceAggregator::new(search.clone(), config.search.max_results);
    let pipeline = Arc::new(ResearchPipeline::new(
        llm.clone(),
        aggregator,
        store.clone(),
        config.llm.retry.clone(),
    ));
    let followup = Arc::new(FollowupEngine::new(
        llm.clone(),
        search.clone(),
        config.llm.retry.clone(),
    ));

    Ok(Arc::new(AppState {
        config,
        llm,
        store,
        pipeline,
        followup,
        search,
    }))
}

/// Build the application router with CORS and request tracing.
pub fn router(state: SharedState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .server
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/research", post(start_research))
        .route("/api/research/{id}", get(get_research))
        .route("/api/research/{id}", delete(delete_research))
        .route("/api/research/{id}/export", get(export_research))
        .route("/api/research/{id}/ask", post(ask_question))
        .route("/api/jobs", get(list_jobs))
        .route("/api/search", post(run_search))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Wraps core errors for status-code mapping.
pub enum ApiError {
    Core(ProspectorError),
    BadRequest(String),
}

impl<E: Into<ProspectorError>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self::Core(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Core(e) => {
                let status = match &e {
                    ProspectorError::Job(JobError::NotFound { .. }) => StatusCode::NOT_FOUND,
                    ProspectorError::Job(JobError::ReportNotReady { .. }) => {
                        StatusCode::BAD_REQUEST
                    }
                    ProspectorError::Job(JobError::QuotaExhausted { .. }) => {
                        StatusCode::TOO_MANY_REQUESTS
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    error!(error = %e, "Request failed");
                }
                (status, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ResearchStartResponse {
    pub job_id: String,
    pub status: JobStatus,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub suggestions: Vec<String>,
    pub qa_remaining: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(default = "default_export_format")]
    pub format: String,
}

fn default_export_format() -> String {
    "md".to_string()
}

#[derive(Debug, Serialize)]
struct JobSummary {
    job_id: String,
    kind: JobKind,
    query: String,
    status: JobStatus,
    created_at: chrono::DateTime<chrono::Utc>,
    duration_secs: Option<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let llm_connected = state.llm.health_check().await;
    Json(json!({
        "status": if llm_connected { "ok" } else { "degraded" },
        "model": state.llm.model_name(),
        "llm_connected": llm_connected,
        "search_url": state.config.search.base_url,
    }))
}

/// Submit a research job. Returns immediately; the pipeline runs as a
/// detached task. Poll `GET /api/research/{id}` for progress.
async fn start_research(
    State(state): State<SharedState>,
    Json(req): Json<ResearchRequest>,
) -> Result<(StatusCode, Json<ResearchStartResponse>), ApiError> {
    let query = req.query.trim().to_string();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let job = Job::new(JobKind::Research, query);
    let job_id = job.id.clone();
    let status = job.status;
    state.store.put(job).await;
    info!(job_id, "Research job submitted");

    let task_state = state.clone();
    let task_id = job_id.clone();
    tokio::spawn(async move {
        task_state.pipeline.run(&task_id).await;
        persist_report(&task_state, &task_id).await;
    });

    Ok((StatusCode::ACCEPTED, Json(ResearchStartResponse { job_id, status })))
}

async fn get_research(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let job = state
        .store
        .get(&id)
        .await
        .ok_or(JobError::NotFound { id })?;
    Ok(Json(job))
}

async fn delete_research(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(JobError::NotFound { id }.into())
    }
}

async fn export_research(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let job = state
        .store
        .get(&id)
        .await
        .ok_or(JobError::NotFound { id: id.clone() })?;
    if !job.has_report() {
        return Err(JobError::ReportNotReady { id }.into());
    }

    if params.format == "json" {
        return Ok(Json(job.report).into_response());
    }

    let md = export::report_markdown(&job)?;
    let filename = format!("{}_report.md", job.query.replace(' ', "_"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        md,
    )
        .into_response())
}

/// Answer a follow-up question against a completed job. The mutated job
/// (appended history, decremented quota) is written back before responding.
async fn ask_question(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let mut job = state
        .store
        .get(&id)
        .await
        .ok_or(JobError::NotFound { id })?;

    let outcome = state.followup.ask(&mut job, req.question.trim()).await?;
    let qa_remaining = job.qa_remaining;
    state.store.put(job).await;

    Ok(Json(AskResponse {
        answer: outcome.answer,
        suggestions: outcome.suggestions,
        qa_remaining,
    }))
}

async fn list_jobs(State(state): State<SharedState>) -> Json<Vec<JobSummary>> {
    let jobs = state.store.list().await;
    Json(
        jobs.into_iter()
            .map(|j| JobSummary {
                job_id: j.id,
                kind: j.kind,
                query: j.query,
                status: j.status,
                created_at: j.created_at,
                duration_secs: j.duration_secs,
            })
            .collect(),
    )
}

/// One-shot web search, recorded as a completed search job.
async fn run_search(
    State(state): State<SharedState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let max = req
        .max_results
        .unwrap_or(state.config.search.max_results);
    let query = SearchQuery::general(req.query.clone(), max);
    let results = state.search.query_cached(&query).await?;

    let mut job = Job::new(JobKind::Search, req.query);
    job.status = JobStatus::Completed;
    job.completed_at = Some(chrono::Utc::now());
    job.operation_result = Some(json!({ "results": results }));
    let job_id = job.id.clone();
    state.store.put(job).await;

    Ok(Json(json!({ "job_id": job_id, "results": results })))
}

/// Persist a completed job (report included) as JSON under the reports dir.
async fn persist_report(state: &SharedState, job_id: &str) {
    let Some(job) = state.store.get(job_id).await else {
        return;
    };
    if !job.has_report() {
        return;
    }
    let dir = &state.config.storage.reports_dir;
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!(error = %e, "Could not create reports directory");
        return;
    }
    let path = dir.join(format!("{job_id}.json"));
    match serde_json::to_vec_pretty(&job) {
        Ok(bytes) => {
            if let Err(e) = tokio::fs::write(&path, bytes).await {
                warn!(path = %path.display(), error = %e, "Report persistence failed");
            } else {
                info!(path = %path.display(), "Report saved");
            }
        }
        Err(e) => warn!(error = %e, "Report serialization failed"),
    }
}
