use std::sync::Arc;

use crate::cache::ResultCache;
use crate::matching::fit_scoring::{FitEngine, FitScorer};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide result cache. Any component may read, write or invalidate any key.
    pub cache: Arc<ResultCache>,
    /// Cached embedding / extraction access; also backs the skills and job endpoints.
    pub engine: Arc<FitEngine>,
    /// Pluggable fit scorer. Default: the engine itself. Swap via ENABLE_AI_MATCHING.
    pub fit_scorer: Arc<dyn FitScorer>,
}
