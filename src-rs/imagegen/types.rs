use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Widescreen,
        AspectRatio::Tall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Tall => "9:16",
        }
    }

    pub fn is_tall(&self) -> bool {
        matches!(self, AspectRatio::Portrait | AspectRatio::Tall)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        AspectRatio::ALL
            .iter()
            .copied()
            .find(|ratio| ratio.as_str() == trimmed)
            .ok_or_else(|| format!("unsupported aspect ratio: {}", raw))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Style {
    #[default]
    Photorealistic,
    Anime,
    Watercolor,
    #[serde(rename = "Digital art")]
    DigitalArt,
    Fantasy,
    Cyberpunk,
    Steampunk,
    Minimalist,
    Impressionistic,
}

impl Style {
    pub const ALL: [Style; 9] = [
        Style::Photorealistic,
        Style::Anime,
        Style::Watercolor,
        Style::DigitalArt,
        Style::Fantasy,
        Style::Cyberpunk,
        Style::Steampunk,
        Style::Minimalist,
        Style::Impressionistic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Photorealistic => "Photorealistic",
            Style::Anime => "Anime",
            Style::Watercolor => "Watercolor",
            Style::DigitalArt => "Digital art",
            Style::Fantasy => "Fantasy",
            Style::Cyberpunk => "Cyberpunk",
            Style::Steampunk => "Steampunk",
            Style::Minimalist => "Minimalist",
            Style::Impressionistic => "Impressionistic",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().to_lowercase();
        Style::ALL
            .iter()
            .copied()
            .find(|style| style.as_str().to_lowercase() == wanted)
            .ok_or_else(|| format!("unsupported style: {}", raw))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub style: Style,
    pub model: Option<String>,
    pub provider: Option<String>,
}

impl ImageRequest {
    pub fn new(prompt: &str, aspect_ratio: AspectRatio, style: Style) -> Self {
        Self {
            prompt: prompt.to_string(),
            aspect_ratio,
            style,
            model: None,
            provider: None,
        }
    }

    /// Prompt text as sent to providers, with the style folded in.
    pub fn styled_prompt(&self) -> String {
        format!("{}, {} style", self.prompt.trim(), self.style.as_str())
    }
}

/// Addressable handle to a generated image: either a remote `http(s)` URL or
/// an inline `data:` URL carrying base64 bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn from_base64(mime_type: &str, payload: &str) -> Self {
        Self(format!("data:{};base64,{}", mime_type, payload))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Splits a `data:<mime>;base64,<payload>` URL into its mime type and
    /// payload. Returns `None` for remote URLs or malformed data URLs.
    pub fn inline_parts(&self) -> Option<(&str, &str)> {
        let rest = self.0.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        let mime = if mime.is_empty() { "application/octet-stream" } else { mime };
        Some((mime, payload))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const UNKNOWN_ERROR: &str = "Unknown error occurred";

#[derive(Clone, Debug)]
pub struct ProviderError {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ProviderError {
    pub fn new(code: &str, message: &str, retryable: bool) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            retryable,
        }
    }

    /// Human-readable text stored on a failed task.
    pub fn user_message(&self) -> String {
        let trimmed = self.message.trim();
        if trimmed.is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: ImageRequest) -> Result<ImageRef, ProviderError>;
}
