//! Fit Scoring — pluggable, trait-based scorer that measures a candidate against a job.
//!
//! Default: `FitEngine` (embedding similarity blended with skill matching,
//! falling back to skill overlap when the provider fails).
//! Alternative: `FallbackFitScorer` (skill overlap only, no provider calls).
//!
//! `AppState` holds an `Arc<dyn FitScorer>`, chosen at startup via config.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::ai_client::{AiError, AiProvider, JobAnalysis};
use crate::cache::keys::{content_hash, CacheKeys};
use crate::cache::ResultCache;
use crate::matching::models::{FitStatus, JobRequirements, MatchInput, MatchResult, ScoredBy};
use crate::matching::similarity::cosine_similarity;
use crate::matching::skills::SkillOverlap;

/// Text → embedding is a pure function, so embeddings live long.
const EMBEDDING_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const SKILLS_TTL: Duration = Duration::from_secs(12 * 60 * 60);
/// Texts shorter than this (trimmed, in chars) are never sent to the provider.
pub const MIN_TEXT_CHARS: usize = 50;

const SEMANTIC_WEIGHT: f64 = 0.4;
const SKILL_WEIGHT: f64 = 0.6;
/// A full nice-to-have match is worth this fraction of a full must-have match.
const NICE_TO_HAVE_WEIGHT: f64 = 0.3;
const FIT_THRESHOLD: f64 = 0.75;
const BORDERLINE_THRESHOLD: f64 = 0.50;
const HIGH_SIMILARITY: f64 = 0.70;

// Fallback heuristic, in whole percentage points.
const FALLBACK_BASE_PCT: i64 = 50;
const FALLBACK_MATCH_PCT: i64 = 10;
const FALLBACK_MISSING_PCT: i64 = 5;
const FALLBACK_FIT_PCT: i64 = 70;
const FALLBACK_BORDERLINE_PCT: i64 = 55;

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The fit scorer trait. Implement this to swap backends without touching
/// the endpoint or handler code.
///
/// Scoring is infallible by contract: operational failures lower the quality
/// of the result, they never abort it.
#[async_trait]
pub trait FitScorer: Send + Sync {
    async fn score(&self, input: &MatchInput) -> MatchResult;
}

/// Skill-overlap-only scorer. Used when AI matching is disabled.
pub struct FallbackFitScorer;

#[async_trait]
impl FitScorer for FallbackFitScorer {
    async fn score(&self, input: &MatchInput) -> MatchResult {
        compute_fit_score_fallback(&input.job_requirements, &input.resume_skills)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FitEngine — semantic + skill scorer with cached provider calls
// ────────────────────────────────────────────────────────────────────────────

pub struct FitEngine {
    cache: Arc<ResultCache>,
    provider: Arc<dyn AiProvider>,
}

#[async_trait]
impl FitScorer for FitEngine {
    async fn score(&self, input: &MatchInput) -> MatchResult {
        self.compute_match_score(input).await
    }
}

impl FitEngine {
    pub fn new(cache: Arc<ResultCache>, provider: Arc<dyn AiProvider>) -> Self {
        Self { cache, provider }
    }

    /// Embedding for `text`, cached by content hash.
    /// `Ok(None)` for blank or too-short text; the provider is not called.
    pub async fn get_embedding(&self, text: &str) -> Result<Option<Vec<f32>>, AiError> {
        let Some(text) = worth_sending(text) else {
            return Ok(None);
        };

        let text_hash = content_hash(text);
        let key = CacheKeys::ai_embedding(&text_hash);
        let embedding = self
            .cache
            .get_or_compute(&key, Some(EMBEDDING_TTL), || async move {
                debug!(text_hash = %text_hash, "Requesting embedding from provider");
                self.provider.embed(text).await
            })
            .await?;

        Ok(Some(embedding))
    }

    /// Skills mentioned in `text`, cached by content hash.
    /// Empty for blank or too-short text, and when the provider fails.
    pub async fn extract_skills_from_text(&self, text: &str) -> Vec<String> {
        let Some(text) = worth_sending(text) else {
            return vec![];
        };

        let text_hash = content_hash(text);
        let key = CacheKeys::ai_skills(&text_hash);
        let result = self
            .cache
            .get_or_compute(&key, Some(SKILLS_TTL), || async move {
                debug!(text_hash = %text_hash, "Requesting skill extraction from provider");
                self.provider.extract_skills(text).await
            })
            .await;

        match result {
            Ok(skills) => skills,
            Err(e) => {
                warn!(text_length = text.len(), error = %e, "Skill extraction failed");
                vec![]
            }
        }
    }

    /// Must-have / nice-to-have skills and seniority read from a job description.
    /// Empty analysis for blank or too-short text, and when the provider fails.
    pub async fn analyze_job_requirements(&self, job_description: &str) -> JobAnalysis {
        let Some(text) = worth_sending(job_description) else {
            return JobAnalysis::default();
        };

        match self.provider.analyze_job(text).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(text_length = text.len(), error = %e, "Job requirement analysis failed");
                JobAnalysis::default()
            }
        }
    }

    /// Scores a candidate against a job. Always returns a well-formed result:
    /// any provider failure switches to the skill-overlap fallback.
    pub async fn compute_match_score(&self, input: &MatchInput) -> MatchResult {
        let result = match self.semantic_match(input).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "AI matching unavailable, using skill-overlap fallback");
                compute_fit_score_fallback(&input.job_requirements, &input.resume_skills)
            }
        };

        info!(
            score = result.score,
            status = %result.status,
            scored_by = ?result.scored_by,
            "Match scored"
        );
        result
    }

    async fn semantic_match(&self, input: &MatchInput) -> Result<MatchResult, AiError> {
        let (job_embedding, resume_embedding) = tokio::join!(
            self.get_embedding(&input.job_description),
            self.get_embedding(&input.resume_text),
        );

        let semantic_score = match (job_embedding?, resume_embedding?) {
            (Some(job), Some(resume)) => cosine_similarity(&job, &resume),
            _ => 0.0,
        };

        Ok(blend_match_score(
            semantic_score,
            &input.job_requirements,
            &input.resume_skills,
        ))
    }
}

/// Trimmed text if it is long enough to be worth a provider call.
fn worth_sending(text: &str) -> Option<&str> {
    let text = text.trim();
    (text.chars().count() >= MIN_TEXT_CHARS).then_some(text)
}

// ────────────────────────────────────────────────────────────────────────────
// Core scoring algorithms
// ────────────────────────────────────────────────────────────────────────────

/// Blends semantic similarity with skill matching.
///
/// skill = must_fraction + nice_fraction × 0.3 (may exceed 1.0)
/// final = clamp(semantic × 0.4 + skill × 0.6, 0, 1)
///
/// A missing must-have skill forces NOT_FIT regardless of the number.
pub fn blend_match_score(
    semantic_score: f64,
    requirements: &JobRequirements,
    candidate_skills: &[String],
) -> MatchResult {
    let overlap = SkillOverlap::compute(requirements, candidate_skills);

    let skill_score = overlap.must_score() + overlap.nice_fraction() * NICE_TO_HAVE_WEIGHT;
    let score = (semantic_score * SEMANTIC_WEIGHT + skill_score * SKILL_WEIGHT).clamp(0.0, 1.0);

    let status = if overlap.has_missing_must() {
        FitStatus::NotFit
    } else if score >= FIT_THRESHOLD {
        FitStatus::Fit
    } else if score >= BORDERLINE_THRESHOLD {
        FitStatus::Borderline
    } else {
        FitStatus::NotFit
    };

    MatchResult {
        score,
        status,
        reasons: build_reasons(&overlap, semantic_score),
        scored_by: ScoredBy::Ai,
    }
}

fn build_reasons(overlap: &SkillOverlap<'_>, semantic_score: f64) -> Vec<String> {
    let mut reasons = Vec::new();

    if !overlap.matched_must.is_empty() {
        reasons.push(format!(
            "Matched must-have skills: {}",
            overlap.matched_must.join(", ")
        ));
    }
    if !overlap.missing_must.is_empty() {
        reasons.push(format!(
            "Missing must-have skills: {}",
            overlap.missing_must.join(", ")
        ));
    }
    if !overlap.matched_nice.is_empty() {
        reasons.push(format!("Bonus skills: {}", overlap.matched_nice.join(", ")));
    } else if overlap.nice_total > 0 {
        reasons.push("No nice-to-have skills matched".to_string());
    }
    if semantic_score > HIGH_SIMILARITY {
        reasons.push("High semantic similarity to job description".to_string());
    }

    reasons
}

/// Provider-free heuristic over must-have skills only.
///
/// base = 0.50 + 0.10 × matched − 0.05 × missing, clamped to [0, 1].
/// FIT ≥ 0.70, BORDERLINE ≥ 0.55. Computed in whole points so identical
/// inputs always land on the same side of a threshold.
pub fn compute_fit_score_fallback(
    requirements: &JobRequirements,
    candidate_skills: &[String],
) -> MatchResult {
    let overlap = SkillOverlap::compute(requirements, candidate_skills);

    let points = (FALLBACK_BASE_PCT + FALLBACK_MATCH_PCT * overlap.matched_must.len() as i64
        - FALLBACK_MISSING_PCT * overlap.missing_must.len() as i64)
        .clamp(0, 100);

    let status = if points >= FALLBACK_FIT_PCT {
        FitStatus::Fit
    } else if points >= FALLBACK_BORDERLINE_PCT {
        FitStatus::Borderline
    } else {
        FitStatus::NotFit
    };

    let matched = if overlap.matched_must.is_empty() {
        "No overlaps".to_string()
    } else {
        format!("Matched skills: {}", overlap.matched_must.join(", "))
    };
    let missing = if overlap.missing_must.is_empty() {
        "All must-haves present".to_string()
    } else {
        format!("Missing must-haves: {}", overlap.missing_must.join(", "))
    };

    MatchResult {
        score: points as f64 / 100.0,
        status,
        reasons: vec![matched, missing],
        scored_by: ScoredBy::Fallback,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
