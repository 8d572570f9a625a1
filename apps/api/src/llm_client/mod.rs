/// Extraction Client: the single point of entry for all structured-extraction
/// service calls in Talentpool.
///
/// ARCHITECTURAL RULE: No other module may call the extraction service
/// directly. All LLM interactions MUST go through this module.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod prompts;

use crate::models::candidate::CandidateFields;
use prompts::{RESUME_PARSE_PROMPT, RESUME_PARSE_SYSTEM};

/// Chosen bound for the extraction call; the remote service imposes nothing.
const REQUEST_TIMEOUT_SECS: u64 = 60;
const MAX_TOKENS: u32 = 2048;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("extraction service error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response is not schema-conformant JSON: {0}")]
    SchemaParse(String),

    #[error("extraction service returned no content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    /// Zero so repeated calls on identical input are stable.
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Seam between the orchestrator and the extraction service, so runs are
/// testable with fakes. `LlmClient` is the production implementation.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    async fn extract(&self, resume_text: &str) -> Result<CandidateFields, LlmError>;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// One request per extraction, no internal retry or backoff: the caller owns
/// the recovery policy. Base URL, key, and model are injected at construction.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            api_key,
            model,
        }
    }

    /// Makes one call to the chat-completions endpoint and returns the raw
    /// content of the first choice.
    pub async fn call(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyContent)?;

        debug!("extraction call succeeded ({} chars)", content.len());
        Ok(content)
    }

    /// Sends normalized resume text for extraction and validates the response
    /// against the candidate schema.
    pub async fn extract_candidate(&self, resume_text: &str) -> Result<CandidateFields, LlmError> {
        let prompt = RESUME_PARSE_PROMPT.replace("{resume_text}", resume_text);
        let content = self.call(RESUME_PARSE_SYSTEM, &prompt).await?;
        let value = recover_json_object(&content)?;
        CandidateFields::from_json(&value).map_err(LlmError::SchemaParse)
    }
}

#[async_trait]
impl StructuredExtractor for LlmClient {
    async fn extract(&self, resume_text: &str) -> Result<CandidateFields, LlmError> {
        self.extract_candidate(resume_text).await
    }
}

/// Recovers a JSON object from service output that may be fenced or wrapped
/// in explanatory prose: direct parse first, then the span between the first
/// `{` and the last `}`.
fn recover_json_object(text: &str) -> Result<Value, LlmError> {
    let text = strip_json_fences(text.trim());

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return Ok(value);
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                if value.is_object() {
                    return Ok(value);
                }
            }
        }
    }

    Err(LlmError::SchemaParse(
        "no JSON object found in response content".to_string(),
    ))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
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
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_recover_json_direct() {
        let value = recover_json_object("{\"full_name\": \"Jane\"}").unwrap();
        assert_eq!(value["full_name"], "Jane");
    }

    #[test]
    fn test_recover_json_wrapped_in_prose() {
        let input = "Here is the extracted data:\n{\"full_name\": \"Jane\"}\nLet me know if you need more.";
        let value = recover_json_object(input).unwrap();
        assert_eq!(value["full_name"], "Jane");
    }

    #[test]
    fn test_recover_json_fenced_and_wrapped() {
        let input = "```json\n{\"skills\": [\"Rust\"]}\n```";
        let value = recover_json_object(input).unwrap();
        assert_eq!(value["skills"][0], "Rust");
    }

    #[test]
    fn test_recover_json_no_object_fails() {
        assert!(matches!(
            recover_json_object("I could not parse the resume."),
            Err(LlmError::SchemaParse(_))
        ));
        assert!(matches!(
            recover_json_object("[1, 2, 3]"),
            Err(LlmError::SchemaParse(_))
        ));
    }

    #[test]
    fn test_recover_json_mismatched_braces_fails() {
        assert!(recover_json_object("} not json {").is_err());
    }

    #[test]
    fn test_prompt_template_substitution() {
        let prompt = RESUME_PARSE_PROMPT.replace("{resume_text}", "Jane Doe, engineer");
        assert!(prompt.contains("Jane Doe, engineer"));
        assert!(!prompt.contains("{resume_text}"));
    }
}
