use std::fmt;

use serde::{Deserialize, Serialize};

/// Skill sets attached to a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequirements {
    #[serde(default)]
    pub must_have: Vec<String>,
    #[serde(default)]
    pub nice_to_have: Vec<String>,
}

/// Everything the engine reads for one match, built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchInput {
    pub job_description: String,
    #[serde(default)]
    pub job_requirements: JobRequirements,
    pub resume_text: String,
    #[serde(default)]
    pub resume_skills: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FitStatus {
    Fit,
    Borderline,
    NotFit,
}

impl fmt::Display for FitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FitStatus::Fit => "FIT",
            FitStatus::Borderline => "BORDERLINE",
            FitStatus::NotFit => "NOT_FIT",
        })
    }
}

/// Which path produced a result — for transparency to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoredBy {
    /// Embedding similarity blended with skill matching.
    Ai,
    /// Skill-overlap heuristic, used when the provider is unavailable.
    Fallback,
    /// Scoring itself failed; minimal placeholder result.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: f64, // 0.0 – 1.0
    pub status: FitStatus,
    pub reasons: Vec<String>,
    pub scored_by: ScoredBy,
}

impl MatchResult {
    /// The result returned when even the fallback scorer could not run.
    pub fn degraded() -> Self {
        Self {
            score: 0.0,
            status: FitStatus::NotFit,
            reasons: vec!["Error in matching process".to_string()],
            scored_by: ScoredBy::Degraded,
        }
    }
}
