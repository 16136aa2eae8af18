//! Prompt-to-image generation.

use std::time::Duration;

use secrecy::ExposeSecret;
use tracing::{debug, instrument};

use kickforge_core::DesignImage;

use super::types::{GenerateBody, GenerateResponse};
use super::{ApiClient, ApiError};

/// How long a generated image is reused for the same prompt.
pub const GENERATED_IMAGE_TTL: Duration = Duration::from_secs(600);

impl ApiClient {
    /// Generate a sneaker image from a text prompt.
    ///
    /// Identical prompts (after trimming and lowercasing) within
    /// [`GENERATED_IMAGE_TTL`] return the cached image.
    ///
    /// # Errors
    ///
    /// Returns error if the generator fails or returns something that is not
    /// an image.
    #[instrument(skip(self))]
    pub async fn generate_image(&self, prompt: &str) -> Result<DesignImage, ApiError> {
        let key = prompt.trim().to_lowercase();
        if let Some(cached) = self.inner.generated.get(&key).await {
            debug!("generated image cache hit");
            return DesignImage::parse(&cached).map_err(|e| ApiError::Parse(e.to_string()));
        }

        let generator = &self.inner.generator;
        let mut request = self
            .inner
            .client
            .post(generator.url.clone())
            .json(&GenerateBody {
                prompt: prompt.trim(),
            });
        if let Some(key) = &generator.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response: GenerateResponse = self.send_json(request).await?;
        let image =
            DesignImage::parse(&response.image).map_err(|e| ApiError::Parse(e.to_string()))?;
        self.inner.generated.insert(key, response.image).await;
        Ok(image)
    }
}
