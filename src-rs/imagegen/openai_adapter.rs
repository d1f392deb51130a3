use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{build_client, classify_failure};
use super::rotation::KeyRing;
use super::types::{AspectRatio, ImageGenerator, ImageRef, ImageRequest, ProviderError};

pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-image-1";

pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

pub struct OpenAiAdapter {
    cfg: OpenAiConfig,
    keys: KeyRing,
    client: Client,
}

impl OpenAiAdapter {
    pub fn new(mut cfg: OpenAiConfig) -> Self {
        if cfg.base_url.is_empty() {
            cfg.base_url = OPENAI_DEFAULT_BASE_URL.to_string();
        }
        if cfg.model.is_empty() {
            cfg.model = OPENAI_DEFAULT_MODEL.to_string();
        }
        Self {
            keys: KeyRing::new(cfg.api_keys.clone()),
            client: build_client(cfg.timeout),
            cfg,
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiAdapter {
    async fn generate(&self, request: ImageRequest) -> Result<ImageRef, ProviderError> {
        if self.keys.is_empty() {
            return Err(ProviderError::new("auth_error", "no OpenAI API keys", false));
        }
        let model = request.model.clone().unwrap_or_else(|| self.cfg.model.clone());
        let payload = json!({
            "model": model,
            "prompt": request.styled_prompt(),
            "n": 1,
            "size": size_for(request.aspect_ratio),
        });

        let mut last_err = None;
        for _ in 0..self.keys.len() {
            let Some(key) = self.keys.next_key() else { break };
            match send_request(&self.client, &self.cfg.base_url, key, &payload).await {
                Ok(image) => return Ok(image),
                Err(err) if err.retryable => {
                    debug!(code = %err.code, "openai request failed, rotating key");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| ProviderError::new("api_error", "request failed", true)))
    }
}

/// The images endpoint only offers three canvas sizes, so ratios snap to the
/// nearest orientation.
fn size_for(ratio: AspectRatio) -> &'static str {
    match ratio {
        AspectRatio::Square => "1024x1024",
        r if r.is_tall() => "1024x1536",
        _ => "1536x1024",
    }
}

async fn send_request(
    client: &Client,
    base_url: &str,
    api_key: &str,
    payload: &Value,
) -> Result<ImageRef, ProviderError> {
    let endpoint = format!("{}/v1/images/generations", base_url.trim_end_matches('/'));
    let resp = client
        .post(endpoint)
        .bearer_auth(api_key)
        .json(payload)
        .send()
        .await
        .map_err(|err| ProviderError::new("network_error", &err.to_string(), true))?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(classify_failure(status, &body));
    }

    let raw: Value = serde_json::from_str(&body)
        .map_err(|_| ProviderError::new("parse_error", "invalid json", false))?;
    let first = raw
        .get("data")
        .and_then(|v| v.as_array())
        .and_then(|list| list.first())
        .ok_or_else(|| ProviderError::new("no_image", "No image was generated.", false))?;

    if let Some(b64) = first.get("b64_json").and_then(|v| v.as_str()) {
        return Ok(ImageRef::from_base64("image/png", b64));
    }
    if let Some(url) = first.get("url").and_then(|v| v.as_str()) {
        return Ok(ImageRef::new(url));
    }
    Err(ProviderError::new("parse_error", "response has no image", false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagegen::types::Style;

    fn adapter(base_url: &str) -> OpenAiAdapter {
        OpenAiAdapter::new(OpenAiConfig {
            api_keys: vec!["sk-test".to_string()],
            base_url: base_url.to_string(),
            model: String::new(),
            timeout: Duration::from_secs(5),
        })
    }

    #[test]
    fn ratios_snap_to_supported_sizes() {
        assert_eq!(size_for(AspectRatio::Square), "1024x1024");
        assert_eq!(size_for(AspectRatio::Widescreen), "1536x1024");
        assert_eq!(size_for(AspectRatio::Landscape), "1536x1024");
        assert_eq!(size_for(AspectRatio::Tall), "1024x1536");
        assert_eq!(size_for(AspectRatio::Portrait), "1024x1536");
    }

    #[tokio::test]
    async fn accepts_remote_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/images/generations")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(r#"{"data":[{"url":"https://cdn.example/img.png"}]}"#)
            .create_async()
            .await;

        let req = ImageRequest::new("a dog", AspectRatio::Tall, Style::Watercolor);
        let image = adapter(&server.url()).generate(req).await.unwrap();
        assert_eq!(image.as_str(), "https://cdn.example/img.png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn surfaces_provider_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/images/generations")
            .with_status(400)
            .with_body(r#"{"error":{"message":"Your request was rejected by the safety system."}}"#)
            .create_async()
            .await;

        let req = ImageRequest::new("a dog", AspectRatio::Square, Style::Anime);
        let err = adapter(&server.url()).generate(req).await.unwrap_err();
        assert_eq!(err.code, "api_error");
        assert_eq!(err.user_message(), "Your request was rejected by the safety system.");
    }
}
