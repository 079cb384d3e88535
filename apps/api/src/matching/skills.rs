//! Skill-set overlap between job requirements and a candidate.
//!
//! Membership is exact and case-sensitive ("Python" ≠ "python"). Lists keep
//! the order in which the job names its skills, with duplicates removed.

use std::collections::HashSet;

use crate::matching::models::JobRequirements;

#[derive(Debug, Clone, PartialEq)]
pub struct SkillOverlap<'a> {
    pub matched_must: Vec<&'a str>,
    pub missing_must: Vec<&'a str>,
    pub matched_nice: Vec<&'a str>,
    pub must_total: usize,
    pub nice_total: usize,
}

impl<'a> SkillOverlap<'a> {
    pub fn compute(requirements: &'a JobRequirements, candidate_skills: &[String]) -> Self {
        let have: HashSet<&str> = candidate_skills.iter().map(String::as_str).collect();

        let must = distinct(&requirements.must_have);
        let nice = distinct(&requirements.nice_to_have);

        let (matched_must, missing_must): (Vec<&str>, Vec<&str>) =
            must.iter().copied().partition(|s| have.contains(s));
        let matched_nice = nice.iter().copied().filter(|s| have.contains(s)).collect();

        Self {
            matched_must,
            missing_must,
            matched_nice,
            must_total: must.len(),
            nice_total: nice.len(),
        }
    }

    /// Fraction of must-have skills present: |must ∩ have| / max(|must|, 1).
    /// A job without must-haves contributes nothing here.
    pub fn must_score(&self) -> f64 {
        self.matched_must.len() as f64 / self.must_total.max(1) as f64
    }

    /// Fraction of nice-to-have skills present, in [0, 1] before weighting.
    pub fn nice_fraction(&self) -> f64 {
        self.matched_nice.len() as f64 / self.nice_total.max(1) as f64
    }

    pub fn has_missing_must(&self) -> bool {
        !self.missing_must.is_empty()
    }
}

fn distinct(skills: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    skills
        .iter()
        .map(String::as_str)
        .filter(|s| seen.insert(*s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reqs(must: &[&str], nice: &[&str]) -> JobRequirements {
        JobRequirements {
            must_have: must.iter().map(|s| s.to_string()).collect(),
            nice_to_have: nice.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn skills(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_partition_keeps_job_order() {
        let r = reqs(&["SQL", "Python", "Go"], &["Docker", "AWS"]);
        let overlap = SkillOverlap::compute(&r, &skills(&["Python", "AWS", "SQL"]));

        assert_eq!(overlap.matched_must, vec!["SQL", "Python"]);
        assert_eq!(overlap.missing_must, vec!["Go"]);
        assert_eq!(overlap.matched_nice, vec!["AWS"]);
        assert!(overlap.has_missing_must());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let r = reqs(&["Python"], &[]);
        let overlap = SkillOverlap::compute(&r, &skills(&["python"]));
        assert_eq!(overlap.missing_must, vec!["Python"]);
    }

    #[test]
    fn test_duplicate_requirements_count_once() {
        let r = reqs(&["Rust", "Rust", "SQL"], &["Docker", "Docker"]);
        let overlap = SkillOverlap::compute(&r, &skills(&["Rust", "Docker"]));

        assert_eq!(overlap.must_total, 2);
        assert_eq!(overlap.nice_total, 1);
        assert!((overlap.must_score() - 0.5).abs() < f64::EPSILON);
        assert!((overlap.nice_fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_must_have_scores_zero_but_misses_nothing() {
        let r = reqs(&[], &["Docker"]);
        let overlap = SkillOverlap::compute(&r, &[]);
        assert_eq!(overlap.must_score(), 0.0);
        assert!(!overlap.has_missing_must());
        assert_eq!(overlap.nice_fraction(), 0.0);
    }

    #[test]
    fn test_empty_nice_to_have_contributes_nothing() {
        let r = reqs(&["Go"], &[]);
        let overlap = SkillOverlap::compute(&r, &skills(&["Go"]));
        assert_eq!(overlap.nice_fraction(), 0.0);
    }
}
