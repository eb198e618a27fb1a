//! In-memory stand-in for the harness-mem daemon.
//!
//! Serves every endpoint the client consumes with the same envelope shape
//! the real service uses: `{ok, source, items, meta}` on success and
//! `{ok: false, error}` with a 4xx status on rejected input.

pub mod store;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;

use store::{event_content, NewObservation, Store};

pub const TOKEN_HEADER: &str = "x-harness-mem-token";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub token: Option<Arc<str>>,
}

pub fn app() -> Router {
    app_with_token(None)
}

/// Router that, when `token` is set, rejects `/v1` calls lacking either the
/// token header or a matching bearer authorization.
pub fn app_with_token(token: Option<String>) -> Router {
    let state = AppState {
        store: Arc::new(RwLock::new(Store::default())),
        token: token.filter(|t| !t.is_empty()).map(Arc::from),
    };
    let v1 = Router::new()
        .route("/v1/search", post(search))
        .route("/v1/timeline", post(timeline))
        .route("/v1/observations/get", post(get_observations))
        .route("/v1/events/record", post(record_event))
        .route("/v1/checkpoints/record", post(record_checkpoint))
        .route("/v1/sessions/finalize", post(finalize_session))
        .route("/v1/resume-pack", post(resume_pack))
        .route("/v1/admin/consolidation/run", post(run_consolidation))
        .route("/v1/admin/consolidation/status", get(consolidation_status))
        .route("/v1/admin/audit-log", get(audit_log))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));
    Router::new()
        .route("/health", get(health))
        .merge(v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_token(listener: TcpListener, token: Option<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// A rejected call: `{ok: false, error}` with a non-2xx status.
pub struct ApiFailure {
    status: StatusCode,
    message: String,
}

impl ApiFailure {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, message = %self.message, "rejecting request");
        let body = json!({
            "ok": false,
            "source": "core",
            "items": [],
            "meta": {"count": 0, "latency_ms": 0},
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiFailure>;

fn envelope(started: Instant, items: Vec<Value>, filters: Value) -> Json<Value> {
    envelope_with(started, items, filters, Map::new())
}

fn envelope_with(started: Instant, items: Vec<Value>, filters: Value, extras: Map<String, Value>) -> Json<Value> {
    let mut meta = Map::new();
    meta.insert("count".to_string(), json!(items.len()));
    meta.insert(
        "latency_ms".to_string(),
        json!((started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0),
    );
    meta.insert("filters".to_string(), filters);
    meta.insert("ranking".to_string(), json!("hybrid_v1"));
    meta.extend(extras);
    Json(json!({
        "ok": true,
        "source": "core",
        "items": items,
        "meta": meta,
    }))
}

/// Rough chars/4 token estimate, as the real daemon reports it.
fn token_estimate(input: &Value, output: &[Value]) -> Value {
    let estimate = |v: &Value| (v.to_string().chars().count() as u64).div_ceil(4);
    let input_tokens = estimate(input);
    let output_tokens: u64 = output.iter().map(estimate).sum();
    json!({
        "estimated_input_tokens": input_tokens,
        "estimated_output_tokens": output_tokens,
        "estimated_total_tokens": input_tokens + output_tokens,
        "strategy": "chars_div_4",
    })
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiFailure> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiFailure::bad_request(format!("{field} is required")))
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

fn token_matches(headers: &HeaderMap, expected: &str) -> bool {
    let custom = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|v| v == expected);
    custom || bearer
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = state.token.as_deref() {
        if !token_matches(request.headers(), expected) {
            return ApiFailure {
                status: StatusCode::UNAUTHORIZED,
                message: "unauthorized".to_string(),
            }
            .into_response();
        }
    }
    next.run(request).await
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<AppState>) -> Json<Value> {
    let started = Instant::now();
    let store = state.store.read().await;
    envelope(
        started,
        vec![json!({"status": "ok", "observations": store.len()})],
        json!({}),
    )
}

#[derive(Deserialize)]
pub struct SearchBody {
    pub query: Option<String>,
    pub project: Option<String>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_private: bool,
    #[serde(default)]
    pub debug: bool,
}

async fn search(State(state): State<AppState>, Json(body): Json<SearchBody>) -> ApiResult {
    let started = Instant::now();
    let query = required(body.query, "query")?;
    let limit = body.limit.unwrap_or(10).clamp(1, 100);
    let store = state.store.read().await;
    let items = store.search(&query, body.project.as_deref(), body.include_private, limit);
    let mut extras = Map::new();
    if body.debug {
        extras.insert("debug".to_string(), json!({"terms": query.split_whitespace().count()}));
    }
    Ok(envelope_with(
        started,
        items,
        json!({"project": body.project, "include_private": body.include_private}),
        extras,
    ))
}

#[derive(Deserialize)]
pub struct TimelineBody {
    pub id: Option<String>,
    pub before: Option<usize>,
    pub after: Option<usize>,
    #[serde(default)]
    pub include_private: bool,
}

async fn timeline(State(state): State<AppState>, Json(body): Json<TimelineBody>) -> ApiResult {
    let started = Instant::now();
    let id = required(body.id, "id")?;
    let store = state.store.read().await;
    let items = store
        .timeline(
            &id,
            body.before.unwrap_or(5),
            body.after.unwrap_or(5),
            body.include_private,
        )
        .ok_or_else(|| ApiFailure::not_found(format!("observation not found: {id}")))?;
    Ok(envelope(started, items, json!({"id": id})))
}

#[derive(Deserialize)]
pub struct GetObservationsBody {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub include_private: bool,
    #[serde(default = "default_true")]
    pub compact: bool,
}

fn default_true() -> bool {
    true
}

async fn get_observations(State(state): State<AppState>, Json(body): Json<GetObservationsBody>) -> ApiResult {
    let started = Instant::now();
    if body.ids.iter().all(|id| id.trim().is_empty()) {
        return Err(ApiFailure::bad_request("ids is required"));
    }
    let store = state.store.read().await;
    let items = store.get_many(&body.ids, body.include_private, body.compact);
    let mut extras = Map::new();
    extras.insert("token_estimate".to_string(), token_estimate(&json!(body.ids), &items));
    Ok(envelope_with(started, items, json!({"compact": body.compact}), extras))
}

#[derive(Deserialize)]
pub struct EventBody {
    pub event: Option<EventFields>,
}

#[derive(Deserialize)]
pub struct EventFields {
    pub event_id: Option<String>,
    pub platform: Option<String>,
    pub project: Option<String>,
    pub session_id: Option<String>,
    pub event_type: Option<String>,
    pub payload: Option<Map<String, Value>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub privacy_tags: Vec<String>,
}

async fn record_event(State(state): State<AppState>, Json(body): Json<EventBody>) -> ApiResult {
    let started = Instant::now();
    let event = body.event.ok_or_else(|| ApiFailure::bad_request("event is required"))?;
    let session_id = required(event.session_id, "event.session_id")?;
    let mut store = state.store.write().await;
    let observation = store.insert(NewObservation {
        event_id: event.event_id,
        platform: event.platform,
        project: event.project,
        session_id,
        title: event.event_type.unwrap_or_else(|| "event".to_string()),
        content: event_content(event.payload.as_ref()),
        tags: event.tags,
        privacy_tags: event.privacy_tags,
    });
    Ok(envelope(started, vec![observation.to_item()], json!({})))
}

#[derive(Deserialize)]
pub struct CheckpointBody {
    pub platform: Option<String>,
    pub project: Option<String>,
    pub session_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub privacy_tags: Vec<String>,
}

async fn record_checkpoint(State(state): State<AppState>, Json(body): Json<CheckpointBody>) -> ApiResult {
    let started = Instant::now();
    let session_id = required(body.session_id, "session_id")?;
    let title = required(body.title, "title")?;
    let content = body.content.unwrap_or_default();
    let mut store = state.store.write().await;
    let observation = store.insert(NewObservation {
        event_id: None,
        platform: body.platform,
        project: body.project,
        session_id,
        title,
        content,
        tags: body.tags,
        privacy_tags: body.privacy_tags,
    });
    Ok(envelope(started, vec![observation.to_item()], json!({})))
}

#[derive(Deserialize)]
pub struct FinalizeBody {
    pub platform: Option<String>,
    pub project: Option<String>,
    pub session_id: Option<String>,
    pub summary_mode: Option<String>,
}

async fn finalize_session(State(state): State<AppState>, Json(body): Json<FinalizeBody>) -> ApiResult {
    let started = Instant::now();
    let session_id = required(body.session_id, "session_id")?;
    let summary_mode = body.summary_mode.unwrap_or_else(|| "standard".to_string());
    if !matches!(summary_mode.as_str(), "standard" | "short" | "detailed") {
        return Err(ApiFailure::bad_request(format!("unsupported summary_mode: {summary_mode}")));
    }
    let mut store = state.store.write().await;
    let item = store.finalize(&session_id, body.project.as_deref(), &summary_mode);
    Ok(envelope(
        started,
        vec![item],
        json!({"platform": body.platform, "project": body.project}),
    ))
}

#[derive(Deserialize)]
pub struct ResumePackBody {
    pub project: Option<String>,
    pub session_id: Option<String>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_private: bool,
}

async fn resume_pack(State(state): State<AppState>, Json(body): Json<ResumePackBody>) -> ApiResult {
    let started = Instant::now();
    let project = required(body.project, "project")?;
    let limit = body.limit.unwrap_or(5).clamp(1, 100);
    let store = state.store.read().await;
    let items = store.resume_pack(&project, body.session_id.as_deref(), body.include_private, limit);
    let mut extras = Map::new();
    extras.insert("token_estimate".to_string(), token_estimate(&json!(project), &items));
    Ok(envelope_with(
        started,
        items,
        json!({"project": project, "session_id": body.session_id}),
        extras,
    ))
}

#[derive(Deserialize)]
pub struct ConsolidationBody {
    pub reason: Option<String>,
    pub project: Option<String>,
    pub session_id: Option<String>,
}

async fn run_consolidation(State(state): State<AppState>, Json(body): Json<ConsolidationBody>) -> ApiResult {
    let started = Instant::now();
    let reason = body.reason.unwrap_or_else(|| "manual".to_string());
    let mut store = state.store.write().await;
    let item = store.run_consolidation(&reason, body.project.as_deref(), body.session_id.as_deref());
    Ok(envelope(started, vec![item], json!({"project": body.project})))
}

async fn consolidation_status(State(state): State<AppState>) -> Json<Value> {
    let started = Instant::now();
    let store = state.store.read().await;
    envelope(started, vec![store.consolidation_status()], json!({}))
}

#[derive(Deserialize)]
pub struct AuditLogParams {
    pub limit: Option<usize>,
    pub action: Option<String>,
    pub target_type: Option<String>,
}

async fn audit_log(State(state): State<AppState>, Query(params): Query<AuditLogParams>) -> Json<Value> {
    let started = Instant::now();
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let store = state.store.read().await;
    let items = store.audit_log(limit, params.action.as_deref(), params.target_type.as_deref());
    envelope(
        started,
        items,
        json!({"action": params.action, "target_type": params.target_type}),
    )
}
