pub mod gemini_adapter;
mod http;
pub mod openai_adapter;
pub mod rotation;
pub mod router;
pub mod types;

pub use gemini_adapter::{GeminiAdapter, GeminiConfig};
pub use openai_adapter::{OpenAiAdapter, OpenAiConfig};
pub use rotation::KeyRing;
pub use router::ImageRouter;
pub use types::{AspectRatio, ImageGenerator, ImageRef, ImageRequest, ProviderError, Style};
