use std::env;
use std::sync::Arc;

use tracing::info;

use crate::config::GridConfig;
use crate::error::ConfigError;
use crate::imagegen::{GeminiAdapter, GeminiConfig, ImageRouter, OpenAiAdapter, OpenAiConfig};
use crate::runner::GenerationSettings;

const KNOWN_PROVIDERS: [&str; 2] = ["gemini", "openai"];

fn load_keys_from_env(primary: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Ok(raw) = env::var(primary) {
        keys.extend(split_keys(&raw));
    }
    for idx in 2..=10 {
        if let Ok(value) = env::var(format!("{}_{}", primary, idx)) {
            keys.extend(split_keys(&value));
        }
    }
    keys
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_gemini_keys() -> Vec<String> {
    load_keys_from_env("GEMINI_API_KEY")
}

pub fn load_openai_keys() -> Vec<String> {
    load_keys_from_env("OPENAI_API_KEY")
}

/// Registers every provider that has keys available. The configured default
/// provider must be among them.
pub fn build_image_router(cfg: &GridConfig) -> Result<ImageRouter, ConfigError> {
    if !KNOWN_PROVIDERS.contains(&cfg.provider.as_str()) {
        return Err(ConfigError::UnknownProvider(cfg.provider.clone()));
    }
    let mut router = ImageRouter::new(&cfg.provider);
    let model_for = |provider: &str| {
        if cfg.provider == provider {
            cfg.model.clone().unwrap_or_default()
        } else {
            String::new()
        }
    };

    let gemini_keys = load_gemini_keys();
    if !gemini_keys.is_empty() {
        let adapter = GeminiAdapter::new(GeminiConfig {
            api_keys: gemini_keys,
            base_url: env::var("GEMINI_BASE_URL").unwrap_or_default(),
            model: model_for("gemini"),
            timeout: cfg.request_timeout(),
        });
        router.register_provider("gemini", Arc::new(adapter));
    } else if cfg.provider == "gemini" {
        return Err(ConfigError::MissingKeys {
            provider: "gemini".to_string(),
            env: "GEMINI_API_KEY".to_string(),
        });
    }

    let openai_keys = load_openai_keys();
    if !openai_keys.is_empty() {
        let adapter = OpenAiAdapter::new(OpenAiConfig {
            api_keys: openai_keys,
            base_url: env::var("OPENAI_BASE_URL").unwrap_or_default(),
            model: model_for("openai"),
            timeout: cfg.request_timeout(),
        });
        router.register_provider("openai", Arc::new(adapter));
    } else if cfg.provider == "openai" {
        return Err(ConfigError::MissingKeys {
            provider: "openai".to_string(),
            env: "OPENAI_API_KEY".to_string(),
        });
    }

    info!(providers = ?router.provider_names(), default_provider = %cfg.provider, "image providers ready");
    Ok(router)
}

/// The startup picker values. Model overrides are per-provider and stay
/// inside the adapters.
pub fn initial_settings(cfg: &GridConfig) -> GenerationSettings {
    GenerationSettings {
        aspect_ratio: cfg.aspect_ratio,
        style: cfg.style,
        provider: None,
        model: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keys_ignores_blanks() {
        assert_eq!(split_keys(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let cfg = GridConfig {
            provider: "dalle-mini".to_string(),
            ..GridConfig::default()
        };
        assert!(matches!(
            build_image_router(&cfg),
            Err(ConfigError::UnknownProvider(name)) if name == "dalle-mini"
        ));
    }
}
