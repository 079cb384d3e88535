pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::cache::handlers as cache_handlers;
use crate::matching::handlers as match_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching API
        .route("/api/v1/match", post(match_handlers::handle_match))
        .route(
            "/api/v1/skills/extract",
            post(match_handlers::handle_extract_skills),
        )
        .route(
            "/api/v1/jobs/analyze",
            post(match_handlers::handle_analyze_job),
        )
        // Cache administration
        .route(
            "/api/v1/cache/status",
            get(cache_handlers::handle_cache_status),
        )
        .route(
            "/api/v1/cache/reconnect",
            post(cache_handlers::handle_cache_reconnect),
        )
        .route("/api/v1/cache/clear", post(cache_handlers::handle_cache_clear))
        .route(
            "/api/v1/cache/clear/:entity_type",
            post(cache_handlers::handle_cache_clear_entity),
        )
        .route(
            "/api/v1/cache/invalidate",
            post(cache_handlers::handle_cache_invalidate),
        )
        .route("/api/v1/cache/stats", get(cache_handlers::handle_cache_stats))
        .with_state(state)
}
