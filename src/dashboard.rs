//! Browser dashboard: a static page plus a thin JSON proxy onto the same
//! tool registry the stdio server uses.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{info, warn};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};

use logstash_mcp::{DispatchError, LogstashApi, ToolCall, ToolRegistry};

const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

pub struct DashboardState {
    registry: ToolRegistry,
    api: Arc<dyn LogstashApi>,
}

type SharedState = Arc<DashboardState>;

/// Error body: `{"error": {"code", "message"}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: i64,
    message: String,
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        let status = match err {
            DispatchError::UnknownTool(_) => StatusCode::NOT_FOUND,
            DispatchError::InvalidArguments { .. } => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: INVALID_PARAMS,
            message: format!("invalid call_tool body: {}", rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": { "code": self.code, "message": self.message } });
        (self.status, Json(body)).into_response()
    }
}

pub fn router(registry: ToolRegistry, api: Arc<dyn LogstashApi>) -> Router {
    let state = Arc::new(DashboardState { registry, api });
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/server_status", get(server_status))
        .route("/start_server", post(start_server))
        .route("/list_tools", get(list_tools))
        .route("/call_tool", post(call_tool))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(addr: &str, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding dashboard to {addr}"))?;
    info!("[dashboard] listening on http://{addr}");
    axum::serve(listener, app).await.context("running dashboard")
}

async fn index() -> Html<&'static str> {
    Html(include_str!("dashboard/index.html"))
}

// Calls go straight to the registry, so there is no session to start.
async fn server_status() -> Json<Value> {
    Json(json!({ "running": true, "initialized": true }))
}

async fn start_server() -> Json<Value> {
    Json(json!({ "success": true, "initialized": true }))
}

async fn list_tools(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({ "result": state.registry.list_tools() }))
}

async fn call_tool(
    State(state): State<SharedState>,
    body: Result<Json<ToolCall>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(call) = body.inspect_err(|e| warn!("[dashboard] rejected call_tool body: {e}"))?;
    let name = call.name.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        state.registry.call_tool(&call, state.api.as_ref())
    })
    .await
    .map_err(|e| {
        warn!("[dashboard] {name} task failed: {e}");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: INTERNAL_ERROR,
            message: format!("tool task failed: {e}"),
        }
    })?;

    let result = outcome?;
    Ok(Json(json!({ "result": result })))
}
