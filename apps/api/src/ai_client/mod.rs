/// AI Client — the single point of entry for embedding and extraction calls.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// Scoring code depends on the `AiProvider` trait, never on `AiClient`.
///
/// Speaks the OpenAI-compatible REST API (`/v1/embeddings`, `/v1/chat/completions`),
/// so any compatible gateway can be pointed at via `OPENAI_BASE_URL`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

pub mod prompts;

use prompts::{
    JOB_ANALYSIS_PROMPT_TEMPLATE, JOB_ANALYSIS_SYSTEM, SKILL_EXTRACTION_PROMPT_TEMPLATE,
    SKILL_EXTRACTION_SYSTEM,
};

const MAX_RETRIES: u32 = 3;
/// Prompts carry at most this many characters of the source text.
pub const PROMPT_TEXT_LIMIT: usize = 2000;
const SKILLS_MAX_TOKENS: u32 = 500;
const ANALYSIS_MAX_TOKENS: u32 = 800;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Provider returned empty content")]
    EmptyContent,

    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

/// Structured requirements extracted from a job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    #[serde(default)]
    pub must_have: Vec<String>,
    #[serde(default)]
    pub nice_to_have: Vec<String>,
    #[serde(default = "unknown_level")]
    pub experience_level: String,
}

fn unknown_level() -> String {
    "unknown".to_string()
}

impl Default for JobAnalysis {
    fn default() -> Self {
        Self {
            must_have: vec![],
            nice_to_have: vec![],
            experience_level: unknown_level(),
        }
    }
}

/// The outbound semantic-similarity / extraction dependency.
///
/// Any call may fail at any time; callers treat every `AiError` the same way.
#[async_trait]
pub trait AiProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError>;

    async fn extract_skills(&self, text: &str) -> Result<Vec<String>, AiError>;

    async fn analyze_job(&self, job_description: &str) -> Result<JobAnalysis, AiError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl ChatResponse {
    fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// HTTP client for the provider, with retry on 429/5xx.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    chat_model: String,
}

impl AiClient {
    pub fn new(config: &Config) -> Result<Self, AiError> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.ai_timeout_secs))
                .build()?,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
        })
    }

    /// POSTs a JSON body and decodes the JSON response.
    /// Retries on 429 (rate limit), 5xx and transport errors with exponential backoff.
    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, AiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<AiError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "AI call to {} attempt {} failed, retrying after {}ms...",
                    path,
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(AiError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("AI API returned {}: {}", status, body);
                last_error = Some(AiError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(AiError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let bytes = response.bytes().await?;
            return Ok(serde_json::from_slice(&bytes)?);
        }

        Err(last_error.unwrap_or(AiError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    async fn chat(&self, system: &str, prompt: &str, max_tokens: u32) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens,
            temperature: TEMPERATURE,
        };

        let response: ChatResponse = self.post_json("/v1/chat/completions", &request).await?;

        if let Some(usage) = &response.usage {
            debug!(
                "Chat call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        response
            .text()
            .map(str::to_string)
            .ok_or(AiError::EmptyContent)
    }
}

#[async_trait]
impl AiProvider for AiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let response: EmbeddingResponse = self.post_json("/v1/embeddings", &request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AiError::Malformed("embedding response has no data".to_string()))?;

        if embedding.is_empty() {
            return Err(AiError::Malformed("embedding vector is empty".to_string()));
        }
        Ok(embedding)
    }

    async fn extract_skills(&self, text: &str) -> Result<Vec<String>, AiError> {
        let prompt =
            SKILL_EXTRACTION_PROMPT_TEMPLATE.replace("{text}", truncate_chars(text, PROMPT_TEXT_LIMIT));
        let reply = self
            .chat(SKILL_EXTRACTION_SYSTEM, &prompt, SKILLS_MAX_TOKENS)
            .await?;
        Ok(parse_skill_list(&reply))
    }

    async fn analyze_job(&self, job_description: &str) -> Result<JobAnalysis, AiError> {
        let prompt = JOB_ANALYSIS_PROMPT_TEMPLATE
            .replace("{job_description}", truncate_chars(job_description, PROMPT_TEXT_LIMIT));
        let reply = self
            .chat(JOB_ANALYSIS_SYSTEM, &prompt, ANALYSIS_MAX_TOKENS)
            .await?;
        Ok(serde_json::from_str(strip_json_fences(&reply))?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output parsing
// ────────────────────────────────────────────────────────────────────────────

/// Returns at most the first `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Parses a model reply into a skill list.
///
/// Accepts a JSON array of strings; anything else is split on commas with
/// brackets and quotes stripped. Blank entries are dropped.
pub fn parse_skill_list(reply: &str) -> Vec<String> {
    let reply = strip_json_fences(reply);

    match serde_json::from_str::<serde_json::Value>(reply) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Ok(_) => vec![],
        Err(_) => reply
            .replace(['[', ']'], "")
            .split(',')
            .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\''))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n[\"Rust\"]\n```";
        assert_eq!(strip_json_fences(input), "[\"Rust\"]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("  [\"Rust\"] "), "[\"Rust\"]");
    }

    #[test]
    fn test_parse_skill_list_json_array() {
        let skills = parse_skill_list(r#"["Python", " SQL ", "", 3, "Docker"]"#);
        assert_eq!(skills, vec!["Python", "SQL", "Docker"]);
    }

    #[test]
    fn test_parse_skill_list_fenced_array() {
        let skills = parse_skill_list("```json\n[\"Go\", \"Kubernetes\"]\n```");
        assert_eq!(skills, vec!["Go", "Kubernetes"]);
    }

    #[test]
    fn test_parse_skill_list_comma_fallback() {
        let skills = parse_skill_list("[Python, 'SQL', \"Docker\", ]");
        assert_eq!(skills, vec!["Python", "SQL", "Docker"]);
    }

    #[test]
    fn test_parse_skill_list_non_array_json_is_empty() {
        assert!(parse_skill_list(r#"{"skills": ["Rust"]}"#).is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_job_analysis_defaults_missing_fields() {
        let analysis: JobAnalysis = serde_json::from_str(r#"{"must_have": ["Rust"]}"#).unwrap();
        assert_eq!(analysis.must_have, vec!["Rust"]);
        assert!(analysis.nice_to_have.is_empty());
        assert_eq!(analysis.experience_level, "unknown");
    }

    #[test]
    fn test_embedding_request_shape() {
        let body = serde_json::to_value(EmbeddingRequest {
            model: "text-embedding-ada-002",
            input: "Senior Rust Engineer",
        })
        .unwrap();
        assert_eq!(body["model"], "text-embedding-ada-002");
        assert_eq!(body["input"], "Senior Rust Engineer");
    }

    #[test]
    fn test_chat_response_text_skips_blank_content() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "  "}}]}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_chat_response_text_trims() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": " [\"Rust\"] "}}], "usage": {"prompt_tokens": 10, "completion_tokens": 3}}"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("[\"Rust\"]"));
    }
}
