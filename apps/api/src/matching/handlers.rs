//! Axum route handlers for the Matching API.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::ai_client::JobAnalysis;
use crate::errors::AppError;
use crate::matching::models::{FitStatus, MatchInput, MatchResult, ScoredBy};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    pub fit_score: f64,
    pub fit_status: FitStatus,
    pub reasons: Vec<String>,
    pub scored_by: ScoredBy,
    pub scored_at: DateTime<Utc>,
}

impl From<MatchResult> for MatchResponse {
    fn from(result: MatchResult) -> Self {
        Self {
            fit_score: result.score,
            fit_status: result.status,
            reasons: result.reasons,
            scored_by: result.scored_by,
            scored_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ExtractSkillsRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractSkillsResponse {
    pub skills: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeJobRequest {
    pub job_description: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/match
///
/// Scores a candidate against a job. Always answers with a result: provider
/// outages yield a fallback score, and a crashed scoring task yields the
/// degraded placeholder. The caller persists the application record.
pub async fn handle_match(
    State(state): State<AppState>,
    Json(input): Json<MatchInput>,
) -> Json<MatchResponse> {
    let scorer = Arc::clone(&state.fit_scorer);
    let result = match tokio::spawn(async move { scorer.score(&input).await }).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Scoring task failed");
            MatchResult::degraded()
        }
    };

    Json(result.into())
}

/// POST /api/v1/skills/extract
///
/// Skills mentioned in a block of resume text. Short text yields an empty list.
pub async fn handle_extract_skills(
    State(state): State<AppState>,
    Json(request): Json<ExtractSkillsRequest>,
) -> Result<Json<ExtractSkillsResponse>, AppError> {
    if request.text.trim().is_empty() {
        return Err(AppError::Validation("text cannot be empty".to_string()));
    }

    let skills = state.engine.extract_skills_from_text(&request.text).await;
    Ok(Json(ExtractSkillsResponse { skills }))
}

/// POST /api/v1/jobs/analyze
///
/// Must-have / nice-to-have skills and experience level for a job description.
pub async fn handle_analyze_job(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeJobRequest>,
) -> Result<Json<JobAnalysis>, AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    Ok(Json(
        state
            .engine
            .analyze_job_requirements(&request.job_description)
            .await,
    ))
}
