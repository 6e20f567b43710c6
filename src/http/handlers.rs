//! Axum HTTP handlers for the web server
//!
//! Provides the stateless streamable MCP endpoint and general metadata
//! endpoints.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinError;
use tracing::error;

use crate::auth::Caller;
use crate::config::TransportKind;
use crate::http::{MESSAGES_PATH, SSE_PATH, STREAMABLE_PATH};
use crate::mcp::rpc::{detached_json_rpc_error, INTERNAL_ERROR, PARSE_ERROR, SERVER_ERROR};
use crate::mcp::server::{process_payload, RequestContext};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub sse_endpoint: Option<&'static str>,
    pub messages_endpoint: Option<&'static str>,
    pub streamable_endpoint: Option<&'static str>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>) -> Json<DiscoveryResponse> {
    let sse = state.adapter.mounts(TransportKind::Sse);
    let streamable = state.adapter.mounts(TransportKind::Streamable);

    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        sse_endpoint: sse.then_some(SSE_PATH),
        messages_endpoint: sse.then_some(MESSAGES_PATH),
        streamable_endpoint: streamable.then_some(STREAMABLE_PATH),
    })
}

pub async fn streamable_endpoint(
    State(state): State<AppState>,
    Extension(Caller(identity)): Extension<Caller>,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(detached_json_rpc_error(PARSE_ERROR, "Parse error")),
            )
                .into_response()
        }
    };

    let context = RequestContext {
        session_id: None,
        identity,
    };
    let outcome = tokio::spawn(async move { process_payload(&state, &context, payload).await }).await;

    match outcome {
        Ok(Some(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(err) => task_failure_response(err),
    }
}

/// A request task that panicked or was cancelled answers with a generic
/// JSON-RPC internal error.
fn task_failure_response(err: JoinError) -> Response {
    error!(error = %err, "error handling MCP request");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(detached_json_rpc_error(INTERNAL_ERROR, "Internal server error")),
    )
        .into_response()
}

/// The stateless transport has no server-initiated stream to open.
pub async fn streamable_get() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [("x-accel-buffering", "no")],
        Json(detached_json_rpc_error(SERVER_ERROR, "Method not allowed.")),
    )
        .into_response()
}

/// The stateless transport has no session to terminate.
pub async fn streamable_delete() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(detached_json_rpc_error(SERVER_ERROR, "Method not allowed.")),
    )
        .into_response()
}
