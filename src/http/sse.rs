//! SSE transport: one long-lived event stream per session plus a POST
//! endpoint that feeds messages into it.

use std::convert::Infallible;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Extension,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::auth::Caller;
use crate::config::UnknownSessionPolicy;
use crate::errors::TransportError;
use crate::mcp::registry::SessionGuard;
use crate::mcp::server::{process_payload, RequestContext};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

pub async fn open_stream(
    State(state): State<AppState>,
    Extension(Caller(identity)): Extension<Caller>,
) -> Response {
    let (guard, receiver) = state.registry.open_session(identity);
    let endpoint = format!(
        "{}?sessionId={}",
        state.adapter.message_endpoint,
        guard.session_id()
    );

    (
        [("x-accel-buffering", "no")],
        Sse::new(session_stream(guard, receiver, endpoint)).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

/// Announces the message endpoint, then relays every message queued for the
/// session. The session stays registered for as long as the stream lives.
fn session_stream(
    guard: SessionGuard,
    mut receiver: mpsc::Receiver<Value>,
    endpoint: String,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().event("endpoint").data(endpoint));

        while let Some(message) = receiver.recv().await {
            yield Ok(Event::default().event("message").data(message.to_string()));
        }
        debug!("sse session stream ended");
    }
}

pub async fn deliver_message(
    State(state): State<AppState>,
    Extension(Caller(identity)): Extension<Caller>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Result<Response, TransportError> {
    let session_id = query
        .session_id
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(TransportError::MissingSessionId)?;

    let Some(session) = state.registry.refresh_identity(&session_id, identity) else {
        return Err(TransportError::SessionNotFound {
            session_id,
            reconnect: state.adapter.unknown_session == UnknownSessionPolicy::Reconnect,
        });
    };

    if session.connection.is_closed() {
        return Err(TransportError::Internal(format!(
            "sse stream for session {session_id} is closed"
        )));
    }

    let payload: Value =
        serde_json::from_slice(&body).map_err(|_| TransportError::InvalidMessage)?;
    debug!(session_id = %session_id, "mcp message received");

    let context = RequestContext {
        session_id: Some(session_id),
        identity: session.identity,
    };
    let connection = session.connection;
    tokio::spawn(async move {
        let Some(response) = process_payload(&state, &context, payload).await else {
            return;
        };
        if let Err(err) = connection.send(response).await {
            warn!(
                session_id = context.session_id.as_deref().unwrap_or("-"),
                error = %err,
                "dropping response for closed session"
            );
        }
    });

    Ok((StatusCode::ACCEPTED, "Accepted").into_response())
}
