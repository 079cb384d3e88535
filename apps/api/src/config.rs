use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => bail!("unknown cache backend '{other}' (expected 'redis' or 'memory')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub cache_backend: CacheBackend,
    pub cache_ttl_secs: u64,
    pub cache_timeout_secs: u64,
    /// 0 disables the background re-probe.
    pub cache_reconnect_secs: u64,
    /// Empty disables AI matching.
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub ai_timeout_secs: u64,
    pub enable_ai_matching: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            redis_url: var("REDIS_URL", "redis://localhost:6379/0"),
            cache_backend: parse(&lookup, "CACHE_BACKEND", CacheBackend::Redis)?,
            cache_ttl_secs: parse(&lookup, "CACHE_TTL", 3600)?,
            cache_timeout_secs: parse(&lookup, "CACHE_TIMEOUT_SECS", 5)?,
            cache_reconnect_secs: parse(&lookup, "CACHE_RECONNECT_SECS", 0)?,
            openai_api_key: var("OPENAI_API_KEY", ""),
            openai_base_url: var("OPENAI_BASE_URL", "https://api.openai.com"),
            embedding_model: var("EMBEDDING_MODEL", "text-embedding-ada-002"),
            chat_model: var("CHAT_MODEL", "gpt-3.5-turbo"),
            ai_timeout_secs: parse(&lookup, "AI_TIMEOUT_SECS", 30)?,
            enable_ai_matching: parse(&lookup, "ENABLE_AI_MATCHING", true)?,
            port: parse(&lookup, "PORT", 8080)?,
            rust_log: var("RUST_LOG", "info"),
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs)
    }

    pub fn cache_reconnect_interval(&self) -> Option<Duration> {
        (self.cache_reconnect_secs > 0).then(|| Duration::from_secs(self.cache_reconnect_secs))
    }

    /// AI matching runs only when enabled and a provider key is configured.
    pub fn ai_matching_active(&self) -> bool {
        self.enable_ai_matching && !self.openai_api_key.trim().is_empty()
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
    }
}
