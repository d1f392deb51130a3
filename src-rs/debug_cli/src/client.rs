use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::models::{AcceptedResponse, Download, GenerateRequest, Options, Settings, TasksResponse};

pub struct HTTPClient {
    pub base_url: String,
    client: Client,
}

impl HTTPClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn generate(&self, req: &GenerateRequest) -> Result<AcceptedResponse, String> {
        let resp = self
            .client
            .post(self.url("/generate"))
            .json(req)
            .send()
            .map_err(|err| err.to_string())?;
        read_json(resp)
    }

    pub fn tasks(&self) -> Result<TasksResponse, String> {
        let resp = self
            .client
            .get(self.url("/tasks"))
            .send()
            .map_err(|err| err.to_string())?;
        read_json(resp)
    }

    pub fn regenerate(&self, id: &str) -> Result<AcceptedResponse, String> {
        let resp = self
            .client
            .post(self.url(&format!("/tasks/{}/regenerate", id)))
            .send()
            .map_err(|err| err.to_string())?;
        read_json(resp)
    }

    pub fn regenerate_failed(&self) -> Result<AcceptedResponse, String> {
        let resp = self
            .client
            .post(self.url("/tasks/regenerate-failed"))
            .send()
            .map_err(|err| err.to_string())?;
        read_json(resp)
    }

    pub fn options(&self) -> Result<Options, String> {
        let resp = self
            .client
            .get(self.url("/options"))
            .send()
            .map_err(|err| err.to_string())?;
        read_json(resp)
    }

    pub fn update_settings(
        &self,
        aspect_ratio: Option<&str>,
        style: Option<&str>,
    ) -> Result<Settings, String> {
        let resp = self
            .client
            .put(self.url("/settings"))
            .json(&json!({"aspect_ratio": aspect_ratio, "style": style}))
            .send()
            .map_err(|err| err.to_string())?;
        read_json(resp)
    }

    /// `Ok(None)` when the service has no finished images to bundle.
    pub fn download(&self) -> Result<Option<Download>, String> {
        let resp = self
            .client
            .get(self.url("/archive"))
            .send()
            .map_err(|err| err.to_string())?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(describe_failure(resp));
        }
        let skipped = resp
            .headers()
            .get("x-skipped-images")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let bytes = resp.bytes().map_err(|err| err.to_string())?;
        Ok(Some(Download {
            bytes: bytes.to_vec(),
            skipped,
        }))
    }

    pub fn image(&self, id: &str) -> Result<Vec<u8>, String> {
        let resp = self
            .client
            .get(self.url(&format!("/tasks/{}/image", id)))
            .send()
            .map_err(|err| err.to_string())?;
        if !resp.status().is_success() {
            return Err(describe_failure(resp));
        }
        let bytes = resp.bytes().map_err(|err| err.to_string())?;
        Ok(bytes.to_vec())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, String> {
    if resp.status().is_success() {
        resp.json::<T>().map_err(|err| err.to_string())
    } else {
        Err(describe_failure(resp))
    }
}

/// Prefers the service's `{"error": ...}` message over the raw body.
fn describe_failure(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(body);
    format!("http {}: {}", status.as_u16(), message)
}
