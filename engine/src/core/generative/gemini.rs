//! Google Gemini Script Writer
//!
//! Plain-text `generateContent` calls used for narration scripts and visual
//! descriptions.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::narration::TextGenerator;
use crate::core::{CoreError, CoreResult};

/// Gemini text generator
pub struct GeminiScriptWriter {
    api_key: String,
    base_url: String,
    model: String,
    #[cfg(feature = "ai-providers")]
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiScriptWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiScriptWriter")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiScriptWriter {
    /// Default Gemini API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default model
    pub const DEFAULT_MODEL: &'static str = "gemini-2.5-flash";

    /// Creates a writer; the HTTP client times out after `timeout`
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> CoreResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "Gemini API key is required (set GEMINI_API_KEY)".to_string(),
            ));
        }

        #[cfg(feature = "ai-providers")]
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        #[cfg(not(feature = "ai-providers"))]
        let _ = timeout;

        Ok(Self {
            api_key,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            #[cfg(feature = "ai-providers")]
            client,
        })
    }

    /// Set custom base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set custom model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

// =============================================================================
// Gemini API Types
// =============================================================================

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[cfg_attr(not(feature = "ai-providers"), allow(dead_code))]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[cfg_attr(not(feature = "ai-providers"), allow(dead_code))]
#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[cfg_attr(not(feature = "ai-providers"), allow(dead_code))]
#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[cfg_attr(not(feature = "ai-providers"), allow(dead_code))]
#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg_attr(not(feature = "ai-providers"), allow(dead_code))]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg_attr(not(feature = "ai-providers"), allow(dead_code))]
#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[cfg_attr(not(feature = "ai-providers"), allow(dead_code))]
#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Concatenates the text parts of the first candidate
#[cfg_attr(not(feature = "ai-providers"), allow(dead_code))]
fn extract_text(body: &str) -> CoreResult<String> {
    let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
        CoreError::GenerationFailed(format!("Failed to parse Gemini response: {}", e))
    })?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(CoreError::GenerationFailed(format!(
            "Content blocked by Gemini safety filters: {}",
            reason
        )));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CoreError::GenerationFailed(
            "Gemini returned no text".to_string(),
        ));
    }
    Ok(text.trim().to_string())
}

#[async_trait]
impl TextGenerator for GeminiScriptWriter {
    fn name(&self) -> &str {
        "gemini"
    }

    #[cfg(feature = "ai-providers")]
    async fn generate_text(&self, prompt: &str) -> CoreResult<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        // API key goes in a header so it never shows up in logged URLs.
        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CoreError::Timeout(format!("Gemini request: {}", e))
                } else {
                    CoreError::GenerationFailed(format!("Gemini request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CoreError::GenerationFailed(format!("Failed to read Gemini response: {}", e))
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiError>(&body)
                .map(|e| {
                    format!(
                        "{} ({})",
                        e.error.message,
                        e.error.status.unwrap_or_default()
                    )
                })
                .unwrap_or_else(|_| body.chars().take(500).collect());
            return Err(CoreError::GenerationFailed(format!(
                "Gemini API error ({}): {}",
                status, detail
            )));
        }

        extract_text(&body)
    }

    #[cfg(not(feature = "ai-providers"))]
    async fn generate_text(&self, _prompt: &str) -> CoreResult<String> {
        Err(CoreError::NotSupported(
            "AI providers feature not enabled. Build with --features ai-providers".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let err = GeminiScriptWriter::new("  ", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_generate_url() {
        let writer = GeminiScriptWriter::new("key", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:8080/v1beta/")
            .with_model("gemini-test");
        assert_eq!(
            writer.generate_url(),
            "http://localhost:8080/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn test_debug_hides_api_key() {
        let writer = GeminiScriptWriter::new("secret-key", Duration::from_secs(5)).unwrap();
        assert!(!format!("{:?}", writer).contains("secret-key"));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Mars has "},{"text":"two moons."}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Mars has two moons.");
    }

    #[test]
    fn test_extract_text_blocked_or_empty() {
        let blocked = r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(extract_text(blocked)
            .unwrap_err()
            .to_string()
            .contains("SAFETY"));

        assert!(extract_text(r#"{"candidates":[]}"#).is_err());
        assert!(extract_text("oops").is_err());
    }
}
