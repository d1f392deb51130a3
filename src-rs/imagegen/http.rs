use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::types::ProviderError;

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Maps a non-success HTTP response onto a provider error code.
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> ProviderError {
    let message = extract_error_message(body);
    let lowered = body.to_lowercase();
    let code = status.as_u16();
    if code == 401 || code == 403 {
        return ProviderError::new("auth_error", &message, true);
    }
    if code == 429 || lowered.contains("quota") || lowered.contains("resource_exhausted") {
        return ProviderError::new("rate_limit", &message, true);
    }
    if status.is_server_error() {
        return ProviderError::new("server_error", &message, true);
    }
    ProviderError::new("api_error", &message, false)
}

/// Both supported providers wrap failures as `{"error": {"message": ...}}`.
fn extract_error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_status() {
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err.code, "rate_limit");
        assert!(err.retryable);

        let err = classify_failure(StatusCode::FORBIDDEN, "");
        assert_eq!(err.code, "auth_error");

        let err = classify_failure(StatusCode::BAD_GATEWAY, "upstream");
        assert_eq!(err.code, "server_error");

        let err = classify_failure(StatusCode::BAD_REQUEST, "bad prompt");
        assert_eq!(err.code, "api_error");
        assert!(!err.retryable);
    }

    #[test]
    fn quota_text_is_rate_limit() {
        let body = r#"{"error":{"code":400,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.code, "rate_limit");
        assert_eq!(err.message, "Quota exceeded");
    }
}
