use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::http::{build_client, classify_failure};
use super::rotation::KeyRing;
use super::types::{ImageGenerator, ImageRef, ImageRequest, ProviderError};

pub const GEMINI_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_DEFAULT_MODEL: &str = "imagen-4.0-generate-001";

const GEMINI_ALLOWED_MODELS: [&str; 4] = [
    "imagen-4.0-generate-001",
    "imagen-4.0-fast-generate-001",
    "imagen-4.0-ultra-generate-001",
    "imagen-3.0-generate-002",
];

pub struct GeminiConfig {
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

pub struct GeminiAdapter {
    cfg: GeminiConfig,
    keys: KeyRing,
    client: Client,
}

impl GeminiAdapter {
    pub fn new(mut cfg: GeminiConfig) -> Self {
        if cfg.base_url.is_empty() {
            cfg.base_url = GEMINI_DEFAULT_BASE_URL.to_string();
        }
        if cfg.model.is_empty() {
            cfg.model = GEMINI_DEFAULT_MODEL.to_string();
        }
        Self {
            keys: KeyRing::new(cfg.api_keys.clone()),
            client: build_client(cfg.timeout),
            cfg,
        }
    }
}

#[async_trait]
impl ImageGenerator for GeminiAdapter {
    async fn generate(&self, request: ImageRequest) -> Result<ImageRef, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.cfg.model.clone());
        if !GEMINI_ALLOWED_MODELS.iter().any(|m| *m == model) {
            return Err(ProviderError::new(
                "invalid_model",
                &format!("model not allowed: {}", model),
                false,
            ));
        }
        if self.keys.is_empty() {
            return Err(ProviderError::new("auth_error", "no Gemini API keys", false));
        }
        let payload = build_payload(&request);

        let mut last_err = None;
        for _ in 0..self.keys.len() {
            let Some(key) = self.keys.next_key() else { break };
            match send_request(&self.client, &self.cfg.base_url, &model, key, &payload).await {
                Ok(image) => return Ok(image),
                Err(err) if err.retryable => {
                    debug!(code = %err.code, "gemini request failed, rotating key");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| ProviderError::new("api_error", "request failed", true)))
    }
}

fn build_payload(request: &ImageRequest) -> Value {
    json!({
        "instances": [
            {"prompt": request.styled_prompt()}
        ],
        "parameters": {
            "sampleCount": 1,
            "aspectRatio": request.aspect_ratio.as_str(),
        }
    })
}

async fn send_request(
    client: &Client,
    base_url: &str,
    model: &str,
    api_key: &str,
    payload: &Value,
) -> Result<ImageRef, ProviderError> {
    let endpoint = format!(
        "{}/v1beta/models/{}:predict",
        base_url.trim_end_matches('/'),
        model
    );
    let resp = client
        .post(endpoint)
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", api_key)
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
    parse_response(&raw)
}

fn parse_response(raw: &Value) -> Result<ImageRef, ProviderError> {
    let first = raw
        .get("predictions")
        .and_then(|v| v.as_array())
        .and_then(|list| list.first());
    let Some(prediction) = first else {
        // Imagen answers 200 with no predictions when every sample is filtered.
        return Err(ProviderError::new(
            "no_image",
            "No image was generated. The prompt may have been blocked.",
            false,
        ));
    };
    if let Some(reason) = prediction.get("raiFilteredReason").and_then(|v| v.as_str()) {
        return Err(ProviderError::new("no_image", reason, false));
    }
    let payload = prediction
        .get("bytesBase64Encoded")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::new("parse_error", "prediction has no image bytes", false))?;
    let mime = prediction
        .get("mimeType")
        .and_then(|v| v.as_str())
        .unwrap_or("image/png");
    Ok(ImageRef::from_base64(mime, payload))
}
