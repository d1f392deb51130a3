use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::types::{ImageGenerator, ImageRef, ImageRequest, ProviderError};

pub struct ImageRouter {
    default_provider: String,
    providers: HashMap<String, Arc<dyn ImageGenerator>>,
}

impl ImageRouter {
    pub fn new(default_provider: &str) -> Self {
        Self {
            default_provider: default_provider.to_string(),
            providers: HashMap::new(),
        }
    }

    pub fn register_provider(&mut self, name: &str, adapter: Arc<dyn ImageGenerator>) {
        self.providers.insert(name.to_string(), adapter);
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl ImageGenerator for ImageRouter {
    async fn generate(&self, request: ImageRequest) -> Result<ImageRef, ProviderError> {
        let provider = request
            .provider
            .clone()
            .unwrap_or_else(|| self.default_provider.clone());
        let adapter = self.providers.get(&provider).ok_or_else(|| {
            ProviderError::new(
                "provider_missing",
                &format!("provider not registered: {}", provider),
                false,
            )
        })?;
        adapter.generate(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagegen::types::{AspectRatio, Style};

    struct Fixed(&'static str);

    #[async_trait]
    impl ImageGenerator for Fixed {
        async fn generate(&self, _request: ImageRequest) -> Result<ImageRef, ProviderError> {
            Ok(ImageRef::new(self.0))
        }
    }

    #[tokio::test]
    async fn dispatches_to_default_or_requested_provider() {
        let mut router = ImageRouter::new("gemini");
        router.register_provider("gemini", Arc::new(Fixed("g")));
        router.register_provider("openai", Arc::new(Fixed("o")));

        let req = ImageRequest::new("x", AspectRatio::Square, Style::Anime);
        assert_eq!(router.generate(req.clone()).await.unwrap().as_str(), "g");

        let mut req = req;
        req.provider = Some("openai".to_string());
        assert_eq!(router.generate(req.clone()).await.unwrap().as_str(), "o");

        req.provider = Some("midjourney".to_string());
        let err = router.generate(req).await.unwrap_err();
        assert_eq!(err.code, "provider_missing");
    }
}
