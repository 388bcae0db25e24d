use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use encore_api::{
    config::Config,
    db::create_cache_store,
    routes::{create_router, AppState},
    services::{providers::LastFmProvider, RecommendationService, RecommendationSettings, TagCache},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let store = create_cache_store(&config)?;

    let provider = Arc::new(LastFmProvider::from_config(&config));
    let service = RecommendationService::new(
        provider,
        TagCache::with_system_clock(store),
        RecommendationSettings::default(),
    );

    let state = AppState {
        service: Arc::new(service),
        history_period: config.top_tracks_period.clone(),
        history_limit: config.top_tracks_limit,
    };

    let app = create_router(state).layer(CorsLayer::permissive());

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
