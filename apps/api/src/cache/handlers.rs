//! Administrative cache endpoints: status, flush, targeted invalidation, stats.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::store::CacheStats;
use crate::cache::{ConnectionState, ResultCache};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheStatusResponse {
    pub connected: bool,
    pub state: ConnectionState,
    pub backend: String,
}

impl CacheStatusResponse {
    fn of(cache: &ResultCache) -> Self {
        Self {
            connected: cache.is_connected(),
            state: cache.state(),
            backend: cache.backend().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheClearResponse {
    pub message: String,
    pub keys_cleared: u64,
}

#[derive(Debug, Deserialize)]
pub struct InvalidateRequest {
    pub entity_type: String,
    pub entity_id: Option<i64>,
}

fn require_connected(cache: &ResultCache) -> Result<(), AppError> {
    if cache.is_connected() {
        Ok(())
    } else {
        Err(AppError::ServiceUnavailable(
            "Cache service not available".to_string(),
        ))
    }
}

/// GET /api/v1/cache/status
pub async fn handle_cache_status(State(state): State<AppState>) -> Json<CacheStatusResponse> {
    Json(CacheStatusResponse::of(&state.cache))
}

/// POST /api/v1/cache/reconnect
///
/// Runs the connection probe again, e.g. after the backing store came back.
pub async fn handle_cache_reconnect(State(state): State<AppState>) -> Json<CacheStatusResponse> {
    state.cache.probe().await;
    Json(CacheStatusResponse::of(&state.cache))
}

/// POST /api/v1/cache/clear
///
/// Flushes every key in the shared keyspace.
pub async fn handle_cache_clear(
    State(state): State<AppState>,
) -> Result<Json<CacheClearResponse>, AppError> {
    require_connected(&state.cache)?;

    let keys_cleared = state.cache.clear_pattern("*").await;
    info!(keys_cleared, "Cache cleared");

    Ok(Json(CacheClearResponse {
        message: format!("Cache cleared successfully. {keys_cleared} keys removed."),
        keys_cleared,
    }))
}

/// POST /api/v1/cache/clear/:entity_type
pub async fn handle_cache_clear_entity(
    State(state): State<AppState>,
    Path(entity_type): Path<String>,
) -> Result<Json<CacheClearResponse>, AppError> {
    require_connected(&state.cache)?;

    let pattern = format!("*{}*", crate::cache::keys::escape_pattern(&entity_type));
    let keys_cleared = state.cache.clear_pattern(&pattern).await;
    info!(entity_type, keys_cleared, "Cache cleared for entity type");

    Ok(Json(CacheClearResponse {
        message: format!("Cache cleared for {entity_type}. {keys_cleared} keys removed."),
        keys_cleared,
    }))
}

/// POST /api/v1/cache/invalidate
///
/// Called by the intake layer after a job or candidate changes.
pub async fn handle_cache_invalidate(
    State(state): State<AppState>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<CacheClearResponse>, AppError> {
    if request.entity_type.trim().is_empty() {
        return Err(AppError::Validation(
            "entity_type cannot be empty".to_string(),
        ));
    }

    let keys_cleared = state
        .cache
        .invalidate_related(&request.entity_type, request.entity_id)
        .await;

    Ok(Json(CacheClearResponse {
        message: format!(
            "Invalidated cache related to {}. {keys_cleared} keys removed.",
            request.entity_type
        ),
        keys_cleared,
    }))
}

/// GET /api/v1/cache/stats
pub async fn handle_cache_stats(
    State(state): State<AppState>,
) -> Result<Json<CacheStats>, AppError> {
    require_connected(&state.cache)?;

    state
        .cache
        .stats()
        .await
        .map(Json)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to get cache stats")))
}
