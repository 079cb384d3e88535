//! Cache key construction. All keys in the shared keyspace are built here so
//! namespaces stay collision-free and pattern invalidation stays meaningful.
//! Entity keys are written by the intake layer; this service only reads the
//! `ai:` namespace itself.

use sha2::{Digest, Sha256};

pub struct CacheKeys;

// Shared with the intake layer, which owns those namespaces.
#[allow(dead_code)]
impl CacheKeys {
    pub fn job(job_id: i64) -> String {
        format!("job:{job_id}")
    }

    pub fn candidate(candidate_id: i64) -> String {
        format!("candidate:{candidate_id}")
    }

    pub fn application(application_id: i64) -> String {
        format!("application:{application_id}")
    }

    pub fn interview_link(token: &str) -> String {
        format!("interview_link:{token}")
    }

    pub fn dashboard_stats() -> String {
        "dashboard:stats".to_string()
    }

    pub fn recent_activity() -> String {
        "dashboard:recent_activity".to_string()
    }
}

impl CacheKeys {
    pub fn ai_embedding(text_hash: &str) -> String {
        format!("ai:embedding:{text_hash}")
    }

    pub fn ai_skills(text_hash: &str) -> String {
        format!("ai:skills:{text_hash}")
    }
}

/// Stable digest of normalized (trimmed) text: lowercase hex SHA-256.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.trim().as_bytes()))
}

/// Escapes glob metacharacters so a literal can be embedded in a pattern.
///
/// Uses bracket classes, which both Redis and the `glob` crate read as literals.
pub fn escape_pattern(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        match c {
            '*' => out.push_str("[*]"),
            '?' => out.push_str("[?]"),
            '[' => out.push_str("[[]"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_keys_are_namespaced() {
        assert_eq!(CacheKeys::job(42), "job:42");
        assert_eq!(CacheKeys::candidate(7), "candidate:7");
        assert_eq!(CacheKeys::application(3), "application:3");
        assert_eq!(CacheKeys::interview_link("tok"), "interview_link:tok");
        assert_eq!(CacheKeys::dashboard_stats(), "dashboard:stats");
        assert_eq!(CacheKeys::recent_activity(), "dashboard:recent_activity");
        assert_eq!(CacheKeys::ai_embedding("ff"), "ai:embedding:ff");
        assert_eq!(CacheKeys::ai_skills("ff"), "ai:skills:ff");
    }

    #[test]
    fn test_content_hash_ignores_surrounding_whitespace() {
        assert_eq!(content_hash("  Senior Rust Engineer \n"), content_hash("Senior Rust Engineer"));
    }

    #[test]
    fn test_content_hash_differs_for_different_text() {
        assert_ne!(content_hash("Rust"), content_hash("rust"));
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        let hash = content_hash("abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_escape_pattern_brackets_metacharacters() {
        assert_eq!(escape_pattern("job"), "job");
        assert_eq!(escape_pattern("a*b?c[d"), "a[*]b[?]c[[]d");
    }

    #[test]
    fn test_escaped_pattern_matches_literal_only() {
        let pattern = glob::Pattern::new(&format!("*{}*", escape_pattern("j*b"))).unwrap();
        assert!(pattern.matches("cache:j*b:1"));
        assert!(!pattern.matches("cache:job:1"));
    }
}
