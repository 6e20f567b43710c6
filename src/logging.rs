use std::time::Instant;

use axum::{
    extract::{Query, Request},
    middleware::Next,
    response::Response,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::auth::USER_DID_HEADER;
use crate::http::sse::MessageQuery;

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// `sessionId` query parameter of an SSE message post, if any.
fn session_id_of(request: &Request) -> Option<String> {
    Query::<MessageQuery>::try_from_uri(request.uri())
        .ok()?
        .0
        .session_id
        .filter(|value| !value.is_empty())
}

pub async fn request_summary_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let session_id = session_id_of(&request);
    let caller = request
        .headers()
        .get(USER_DID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous")
        .to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        session_id = session_id.as_deref().unwrap_or("-"),
        caller = %caller,
        duration_ms = started_at.elapsed().as_millis(),
        "request summary"
    );

    response
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http};

    use super::*;

    fn request(uri: &str) -> Request {
        http::Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request build")
    }

    #[test]
    fn extracts_session_id_from_query() {
        assert_eq!(
            session_id_of(&request("/mcp/messages?foo=1&sessionId=abc")),
            Some("abc".to_string())
        );
        assert_eq!(
            session_id_of(&request("/mcp/messages?sessionId=a%2Fb%20c")),
            Some("a/b c".to_string())
        );
        assert_eq!(session_id_of(&request("/mcp/messages?sessionId=")), None);
        assert_eq!(session_id_of(&request("/mcp")), None);
    }
}
