//! OpenRouter Image Provider
//!
//! Generates a still image through OpenRouter's chat completions endpoint
//! and turns it into a vertical background video with FFmpeg.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::Value;
use tracing::{debug, info};

use super::providers::{VisualProvider, VisualRequest};
use crate::core::ffmpeg::{FFmpegRunner, ReelRenderSettings};
use crate::core::script::enhance_visual_prompt;
use crate::core::{CoreError, CoreResult, TimeSec, VisualAsset};

/// Model used for unknown aliases
pub const DEFAULT_IMAGE_MODEL: &str = "black-forest-labs/flux.2-klein-4b";

/// Maps a visual model alias to an OpenRouter model id.
///
/// Unknown aliases fall back to [`DEFAULT_IMAGE_MODEL`].
pub fn resolve_image_model(alias: &str) -> &'static str {
    match alias.trim().to_lowercase().as_str() {
        "sdxl" => "stabilityai/stable-diffusion-xl-base-1.0",
        "dall-e-3" => "openai/dall-e-3",
        _ => DEFAULT_IMAGE_MODEL,
    }
}

/// Image returned by the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Remote image to download
    Url(String),
    /// Base64 data, optionally wrapped in a `data:image/...;base64,` URL
    Base64(String),
}

impl ImagePayload {
    fn from_image_url(url: &str) -> Self {
        if url.starts_with("data:image") {
            ImagePayload::Base64(url.to_string())
        } else {
            ImagePayload::Url(url.to_string())
        }
    }
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Reads `image_url.url` (or `imageUrl.url`) from an image block
fn nested_image_url(block: &Value) -> Option<&str> {
    let object = block
        .get("image_url")
        .filter(|v| v.is_object())
        .or_else(|| block.get("imageUrl").filter(|v| v.is_object()))?;
    non_empty_str(object, "url")
}

/// Finds the generated image in a chat completions response.
///
/// Looks at `message.images`, then image blocks in `message.content`, then
/// the legacy `data[0]` and top-level shapes.
pub fn extract_image_payload(response: &Value) -> Option<ImagePayload> {
    if let Some(message) = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
    {
        if let Some(first) = message
            .get("images")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
        {
            if let Some(url) = nested_image_url(first) {
                return Some(ImagePayload::from_image_url(url));
            }
            if let Some(url) = non_empty_str(first, "url") {
                return Some(ImagePayload::Url(url.to_string()));
            }
            if let Some(b64) = non_empty_str(first, "b64_json") {
                return Some(ImagePayload::Base64(b64.to_string()));
            }
        }

        if let Some(parts) = message.get("content").and_then(Value::as_array) {
            for part in parts {
                let is_image = matches!(
                    part.get("type").and_then(Value::as_str),
                    Some("image_url") | Some("output_image")
                );
                if !is_image {
                    continue;
                }
                if let Some(url) = nested_image_url(part) {
                    return Some(ImagePayload::from_image_url(url));
                }
            }
        }
    }

    if let Some(item) = response
        .get("data")
        .and_then(Value::as_array)
        .and_then(|data| data.first())
    {
        if let Some(url) = non_empty_str(item, "url").or_else(|| non_empty_str(item, "image_url"))
        {
            return Some(ImagePayload::Url(url.to_string()));
        }
        if let Some(b64) = non_empty_str(item, "b64_json").or_else(|| non_empty_str(item, "b64")) {
            return Some(ImagePayload::Base64(b64.to_string()));
        }
    }

    if let Some(url) =
        non_empty_str(response, "url").or_else(|| non_empty_str(response, "image_url"))
    {
        return Some(ImagePayload::Url(url.to_string()));
    }
    non_empty_str(response, "b64_json").map(|b64| ImagePayload::Base64(b64.to_string()))
}

/// Decodes a base64 image, stripping any `data:image` prefix
pub fn decode_base64_payload(raw: &str) -> CoreResult<Vec<u8>> {
    let data = match raw.split_once(',') {
        Some((_, data)) if raw.starts_with("data:image") => data,
        _ => raw,
    };
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| CoreError::GenerationFailed(format!("Invalid base64 image data: {}", e)))
}

/// Keeps request ids usable as file names
fn sanitize_request_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(64)
        .collect();
    if cleaned.is_empty() {
        ulid::Ulid::new().to_string()
    } else {
        cleaned
    }
}

/// OpenRouter-backed [`VisualProvider`]
pub struct OpenRouterImageProvider {
    api_key: Option<String>,
    endpoint: String,
    title: String,
    runner: FFmpegRunner,
    render: ReelRenderSettings,
    #[cfg(feature = "ai-providers")]
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenRouterImageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterImageProvider")
            .field("endpoint", &self.endpoint)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl OpenRouterImageProvider {
    /// Default chat completions endpoint
    pub const DEFAULT_ENDPOINT: &'static str = "https://openrouter.ai/api/v1/chat/completions";

    /// Creates a provider.
    ///
    /// A missing key is not an error here: every request then fails, which
    /// the pipeline turns into a placeholder visual.
    pub fn new(
        api_key: Option<String>,
        runner: FFmpegRunner,
        render: ReelRenderSettings,
        timeout: Duration,
    ) -> CoreResult<Self> {
        #[cfg(feature = "ai-providers")]
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        #[cfg(not(feature = "ai-providers"))]
        let _ = timeout;

        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            title: "ReelRun".to_string(),
            runner,
            render,
            #[cfg(feature = "ai-providers")]
            client,
        })
    }

    /// Set custom endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Builds the JSON body for a request
    pub fn build_request_body(request: &VisualRequest) -> Value {
        serde_json::json!({
            "model": resolve_image_model(&request.model),
            "messages": [
                {
                    "role": "user",
                    "content": enhance_visual_prompt(&request.prompt, &request.style),
                }
            ],
            "modalities": ["image"],
            "image_config": {
                "aspect_ratio": "9:16",
                "image_size": "1K",
            },
            "stream": false,
        })
    }

    #[cfg(feature = "ai-providers")]
    async fn request_image(&self, request: &VisualRequest) -> CoreResult<Value> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            CoreError::GenerationFailed("OpenRouter API key is not configured".to_string())
        })?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("HTTP-Referer", "http://localhost")
            .header("X-Title", &self.title)
            .json(&Self::build_request_body(request))
            .send()
            .await
            .map_err(map_http_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::GenerationFailed(format!(
                "OpenRouter API error ({}): {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            CoreError::GenerationFailed(format!("Failed to parse OpenRouter response: {}", e))
        })
    }

    #[cfg(not(feature = "ai-providers"))]
    async fn request_image(&self, _request: &VisualRequest) -> CoreResult<Value> {
        Err(CoreError::NotSupported(
            "AI providers feature not enabled. Build with --features ai-providers".to_string(),
        ))
    }

    #[cfg(feature = "ai-providers")]
    async fn download(&self, url: &str) -> CoreResult<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(map_http_error)?;
        if !response.status().is_success() {
            return Err(CoreError::GenerationFailed(format!(
                "Image download failed: {}",
                response.status()
            )));
        }
        let bytes = response.bytes().await.map_err(map_http_error)?;
        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "ai-providers"))]
    async fn download(&self, _url: &str) -> CoreResult<Vec<u8>> {
        Err(CoreError::NotSupported(
            "AI providers feature not enabled. Build with --features ai-providers".to_string(),
        ))
    }

    async fn save_image(&self, payload: &ImagePayload, path: &Path) -> CoreResult<()> {
        let bytes = match payload {
            ImagePayload::Url(url) => self.download(url).await?,
            ImagePayload::Base64(raw) => decode_base64_payload(raw)?,
        };
        if bytes.is_empty() {
            return Err(CoreError::GenerationFailed(
                "Generated image is empty".to_string(),
            ));
        }
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }
}

#[cfg(feature = "ai-providers")]
fn map_http_error(e: reqwest::Error) -> CoreError {
    if e.is_timeout() {
        CoreError::Timeout(format!("OpenRouter request: {}", e))
    } else {
        CoreError::GenerationFailed(format!("OpenRouter request failed: {}", e))
    }
}

#[async_trait]
impl VisualProvider for OpenRouterImageProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn generate_visual(
        &self,
        request: &VisualRequest,
        duration_seconds: TimeSec,
        out_dir: &Path,
    ) -> CoreResult<VisualAsset> {
        info!(
            "Generating background image with {} ({})",
            request.model,
            resolve_image_model(&request.model)
        );
        debug!("Visual prompt: {}", request.prompt);

        let response = self.request_image(request).await?;
        let payload = extract_image_payload(&response).ok_or_else(|| {
            CoreError::GenerationFailed("No image payload returned".to_string())
        })?;

        let request_id = response
            .get("id")
            .and_then(Value::as_str)
            .map(sanitize_request_id)
            .unwrap_or_else(|| ulid::Ulid::new().to_string());

        tokio::fs::create_dir_all(out_dir).await?;
        let image_path = out_dir.join(format!("{}.png", request_id));
        self.save_image(&payload, &image_path).await?;

        let video_path: PathBuf = out_dir.join(format!("{}.mp4", request_id));
        self.runner
            .image_to_video(&image_path, duration_seconds, &video_path, &self.render)
            .await
            .map_err(|e| {
                CoreError::GenerationFailed(format!("Image-to-video conversion failed: {}", e))
            })?;

        info!("Background video ready: {}", video_path.display());
        Ok(VisualAsset::generated(video_path, duration_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_image_model() {
        assert_eq!(resolve_image_model("flux"), DEFAULT_IMAGE_MODEL);
        assert_eq!(
            resolve_image_model("SDXL"),
            "stabilityai/stable-diffusion-xl-base-1.0"
        );
        assert_eq!(resolve_image_model("dall-e-3"), "openai/dall-e-3");
        assert_eq!(resolve_image_model("midjourney"), DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn test_request_body_shape() {
        let body = OpenRouterImageProvider::build_request_body(&VisualRequest {
            prompt: "A red planet.".to_string(),
            style: "cinematic".to_string(),
            model: "flux".to_string(),
        });
        assert_eq!(body["model"], DEFAULT_IMAGE_MODEL);
        assert_eq!(body["modalities"], json!(["image"]));
        assert_eq!(body["image_config"]["aspect_ratio"], "9:16");
        assert_eq!(body["stream"], false);
        assert_eq!(
            body["messages"][0]["content"],
            "A red planet. Style: cinematic, professional quality, vertical 9:16 composition"
        );
    }

    // =========================================================================
    // Payload Extraction Tests
    // =========================================================================

    #[test]
    fn test_extract_from_message_images() {
        let response = json!({
            "choices": [{"message": {"images": [
                {"type": "image_url", "image_url": {"url": "https://cdn.example/a.png"}}
            ]}}]
        });
        assert_eq!(
            extract_image_payload(&response),
            Some(ImagePayload::Url("https://cdn.example/a.png".to_string()))
        );
    }

    #[test]
    fn test_extract_data_url_is_base64() {
        let response = json!({
            "choices": [{"message": {"images": [
                {"imageUrl": {"url": "data:image/png;base64,iVBORw0KGgo="}}
            ]}}]
        });
        assert_eq!(
            extract_image_payload(&response),
            Some(ImagePayload::Base64(
                "data:image/png;base64,iVBORw0KGgo=".to_string()
            ))
        );
    }

    #[test]
    fn test_extract_from_content_blocks() {
        let response = json!({
            "choices": [{"message": {"content": [
                {"type": "text", "text": "here you go"},
                {"type": "output_image", "image_url": {"url": "https://cdn.example/b.png"}}
            ]}}]
        });
        assert_eq!(
            extract_image_payload(&response),
            Some(ImagePayload::Url("https://cdn.example/b.png".to_string()))
        );
    }

    #[test]
    fn test_extract_legacy_shapes() {
        let data = json!({"data": [{"b64_json": "AAAA"}]});
        assert_eq!(
            extract_image_payload(&data),
            Some(ImagePayload::Base64("AAAA".to_string()))
        );

        let top = json!({"image_url": "https://cdn.example/c.png"});
        assert_eq!(
            extract_image_payload(&top),
            Some(ImagePayload::Url("https://cdn.example/c.png".to_string()))
        );
    }

    #[test]
    fn test_extract_none_for_text_only_response() {
        let response = json!({
            "choices": [{"message": {"content": "I cannot draw that."}}]
        });
        assert_eq!(extract_image_payload(&response), None);
    }

    #[test]
    fn test_decode_base64_payload() {
        assert_eq!(
            decode_base64_payload("data:image/png;base64,aGVsbG8=").unwrap(),
            b"hello"
        );
        assert_eq!(decode_base64_payload("aGVsbG8=").unwrap(), b"hello");
        assert!(matches!(
            decode_base64_payload("not base64!"),
            Err(CoreError::GenerationFailed(_))
        ));
    }

    #[test]
    fn test_sanitize_request_id() {
        assert_eq!(sanitize_request_id("gen-123_abc"), "gen-123_abc");
        assert_eq!(sanitize_request_id("../../etc"), "etc");
        assert_eq!(sanitize_request_id("///").len(), 26);
    }
}
