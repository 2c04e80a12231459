use crate::app::controller::ExpansionError;
use crate::app::dto::*;
use crate::app::engine::CallFlowEngine;
use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct HttpState {
    pub engine: CallFlowEngine,
}

#[derive(Debug, Clone, serde::Serialize)]
struct ApiErrorBody {
    error: String,
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> axum::response::Response {
    (status, Json(ApiErrorBody { error: msg.into() })).into_response()
}

fn expansion_error(e: ExpansionError) -> axum::response::Response {
    let status = match e {
        ExpansionError::NoSession => StatusCode::NOT_FOUND,
        ExpansionError::UnknownBranch(_) => StatusCode::BAD_REQUEST,
    };
    api_error(status, e.to_string())
}

pub fn build_router(engine: CallFlowEngine) -> Router {
    let state = Arc::new(HttpState { engine });

    Router::new()
        .route("/health", get(health))
        .route("/session", post(select_function).delete(close_session))
        .route("/graph", get(graph))
        .route("/status", get(status))
        .route("/branches/expand-all", post(expand_all))
        .route("/branches/collapse-all", post(collapse_all))
        .route("/branches/{branch_id}/toggle", post(toggle))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(engine: CallFlowEngine, addr: SocketAddr) -> Result<()> {
    let app = build_router(engine);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    Json(state.engine.health())
}

async fn select_function(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<SelectFunctionRequest>,
) -> impl IntoResponse {
    let request = state.engine.request_from(req);
    match state.engine.select_function(request).await {
        Ok(Some(res)) => Json(res).into_response(),
        Ok(None) => api_error(
            StatusCode::CONFLICT,
            "selection superseded by a newer request",
        ),
        Err(e) => api_error(StatusCode::BAD_GATEWAY, format!("{e:#}")),
    }
}

async fn close_session(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    if state.engine.close_session() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        api_error(StatusCode::NOT_FOUND, ExpansionError::NoSession.to_string())
    }
}

async fn graph(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    match state.engine.graph() {
        Some(res) => Json(res).into_response(),
        None => expansion_error(ExpansionError::NoSession),
    }
}

async fn status(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    match state.engine.status() {
        Some(res) => Json(res).into_response(),
        None => expansion_error(ExpansionError::NoSession),
    }
}

async fn toggle(
    State(state): State<Arc<HttpState>>,
    Path(branch_id): Path<String>,
) -> impl IntoResponse {
    match state.engine.toggle_branch(&branch_id).await {
        Ok(res) => Json(res).into_response(),
        Err(e) => expansion_error(e),
    }
}

async fn expand_all(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    match state.engine.expand_all().await {
        Ok(res) => Json(res).into_response(),
        Err(e) => expansion_error(e),
    }
}

async fn collapse_all(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    match state.engine.collapse_all() {
        Ok(res) => Json(res).into_response(),
        Err(e) => expansion_error(e),
    }
}
