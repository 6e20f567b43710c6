use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod storyteller;

use config::TransportKind;
use domain::policy::ToolPolicies;
use http::AdapterOptions;
use mcp::registry::TransportRegistry;
use storyteller::StoryTeller;

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TransportRegistry>,
    pub policies: Arc<ToolPolicies>,
    pub story_teller: Arc<dyn StoryTeller>,
    pub adapter: Arc<AdapterOptions>,
}

impl AppState {
    pub fn new(
        policies: ToolPolicies,
        story_teller: Arc<dyn StoryTeller>,
        adapter: AdapterOptions,
    ) -> Self {
        Self {
            registry: Arc::new(TransportRegistry::new()),
            policies: Arc::new(policies),
            story_teller,
            adapter: Arc::new(adapter),
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let mut mcp_routes = Router::new();
    if state.adapter.mounts(TransportKind::Sse) {
        mcp_routes = mcp_routes
            .route(http::SSE_PATH, get(http::sse::open_stream))
            .route(http::MESSAGES_PATH, post(http::sse::deliver_message));
    }
    if state.adapter.mounts(TransportKind::Streamable) {
        mcp_routes = mcp_routes.route(
            http::STREAMABLE_PATH,
            post(http::handlers::streamable_endpoint)
                .get(http::handlers::streamable_get)
                .delete(http::handlers::streamable_delete),
        );
    }

    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .merge(mcp_routes.layer(middleware::from_fn(auth::attach_caller_identity)))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer())
        .layer(middleware::from_fn(logging::request_summary_middleware))
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
