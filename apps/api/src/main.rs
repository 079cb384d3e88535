mod ai_client;
mod cache;
mod config;
mod errors;
mod matching;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::ai_client::AiClient;
use crate::cache::memory_store::MemoryStore;
use crate::cache::redis_store::RedisStore;
use crate::cache::store::CacheStore;
use crate::cache::ResultCache;
use crate::config::{CacheBackend, Config};
use crate::matching::fit_scoring::{FallbackFitScorer, FitEngine, FitScorer};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Match API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize result cache. An unreachable store is not fatal: the cache
    // stays DISCONNECTED and every lookup degrades to a miss.
    let store: Arc<dyn CacheStore> = match config.cache_backend {
        CacheBackend::Redis => Arc::new(RedisStore::new(&config.redis_url, config.cache_timeout())?),
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
    };
    let cache = Arc::new(ResultCache::new(store, config.cache_ttl()));
    let cache_state = cache.probe().await;
    info!(backend = cache.backend(), state = ?cache_state, "Result cache initialized");

    if let Some(every) = config.cache_reconnect_interval() {
        cache.clone().spawn_reconnect_loop(every);
        info!(interval_secs = every.as_secs(), "Cache reconnect loop started");
    }

    // Initialize AI provider client
    let provider = Arc::new(AiClient::new(&config)?);
    info!(
        "AI client initialized (embedding: {}, chat: {})",
        config.embedding_model, config.chat_model
    );

    let engine = Arc::new(FitEngine::new(cache.clone(), provider));

    // Initialize fit scorer (FitEngine when AI matching is active, heuristic otherwise)
    let fit_scorer: Arc<dyn FitScorer> = if config.ai_matching_active() {
        engine.clone()
    } else {
        warn!("AI matching disabled or no provider key configured; using fallback scorer");
        Arc::new(FallbackFitScorer)
    };

    // Build app state
    let state = AppState {
        cache,
        engine,
        fit_scorer,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
