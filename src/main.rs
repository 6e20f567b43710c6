use std::sync::Arc;

use blocklet_mcp_server::{
    build_app,
    config::Config,
    domain::policy::ToolPolicies,
    http::AdapterOptions,
    logging,
    mcp::registry::TransportRegistry,
    storyteller::{AnthropicStoryTeller, StoryTeller, UnconfiguredStoryTeller},
    AppState,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let policies = ToolPolicies::load(config.policy_file.as_deref())?;

    let story_teller: Arc<dyn StoryTeller> = match config.anthropic_api_key.clone() {
        Some(api_key) => Arc::new(AnthropicStoryTeller::new(
            api_key,
            config.story_model.clone(),
            config.story_timeout,
        )?),
        None => {
            warn!("ANTHROPIC_API_KEY is not set, storytelling tool will report an error");
            Arc::new(UnconfiguredStoryTeller)
        }
    };

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(policies, story_teller, AdapterOptions::from_config(&config));
    let registry = Arc::clone(&state.registry);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        mount_point = %config.mount_point,
        "server starting"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(registry))
        .await?;
    Ok(())
}

async fn shutdown_signal(registry: Arc<TransportRegistry>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    let closed = registry.close_all();
    info!(closed_sessions = closed, "shutting down, closed open sse sessions");
}
