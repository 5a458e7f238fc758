use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use lecture_relay::{
    config::Config,
    routes,
    services::gemini::GeminiBackend,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "starting lecture relay");

    let backend = GeminiBackend::new(
        config.api_key.clone(),
        config.model.clone(),
        config.api_base.clone(),
        config.model_timeout,
    )
    .context("failed to build model client")?;

    let state = Arc::new(AppState::new(Arc::new(backend), config.sessions.clone(), true));
    let _sweeper = state.sessions.spawn_sweeper();

    let app = routes::create_router()
        .with_state(state)
        .layer(CorsLayer::very_permissive());

    let listener = config
        .bind_listener()
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;

    let addr = listener.local_addr()?;
    tracing::info!(%addr, "lecture relay listening");
    axum::serve(listener, app).await?;
    Ok(())
}
