use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::imagegen::{AspectRatio, Style};

#[derive(Clone, Debug)]
pub struct GridConfig {
    pub provider: String,
    pub model: Option<String>,
    pub aspect_ratio: AspectRatio,
    pub style: Style,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            aspect_ratio: AspectRatio::default(),
            style: Style::default(),
            port: 8080,
            request_timeout_secs: 120,
            log_filter: "info".to_string(),
        }
    }
}

impl GridConfig {
    /// Defaults overlaid with `PROMPT_GRID_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(provider) = env_opt("PROMPT_GRID_PROVIDER") {
            cfg.provider = provider.to_lowercase();
        }
        cfg.model = env_opt("PROMPT_GRID_MODEL");
        if let Some(raw) = env_opt("PROMPT_GRID_ASPECT_RATIO") {
            cfg.aspect_ratio = parse_setting("PROMPT_GRID_ASPECT_RATIO", &raw)?;
        }
        if let Some(raw) = env_opt("PROMPT_GRID_STYLE") {
            cfg.style = parse_setting("PROMPT_GRID_STYLE", &raw)?;
        }
        if let Some(raw) = env_opt("PORT") {
            cfg.port = parse_setting("PORT", &raw)?;
        }
        if let Some(raw) = env_opt("PROMPT_GRID_TIMEOUT_SECS") {
            cfg.request_timeout_secs = parse_setting("PROMPT_GRID_TIMEOUT_SECS", &raw)?;
        }
        if let Some(filter) = env_opt("PROMPT_GRID_LOG") {
            cfg.log_filter = filter;
        }
        Ok(cfg)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

fn parse_setting<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: ToString,
{
    raw.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

fn env_opt(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_picker_defaults() {
        let cfg = GridConfig::default();
        assert_eq!(cfg.provider, "gemini");
        assert_eq!(cfg.aspect_ratio, AspectRatio::Square);
        assert_eq!(cfg.style, Style::Photorealistic);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn parse_setting_reports_key() {
        let err = parse_setting::<AspectRatio>("PROMPT_GRID_ASPECT_RATIO", "5:4").unwrap_err();
        assert!(err.to_string().contains("PROMPT_GRID_ASPECT_RATIO"));
    }
}
