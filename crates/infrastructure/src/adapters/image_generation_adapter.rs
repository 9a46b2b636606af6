//! Image generation adapter - Implements ImageGenerationPort using ai_core

use std::sync::Arc;

use ai_core::{ImageGenerator, ImageStyle, InferenceConfig, MiniMaxClient};
use application::{
    error::ApplicationError,
    ports::{GeneratedImage, ImageGenerationPort, ImageRequest},
};
use async_trait::async_trait;
use tracing::instrument;

use super::map_inference_error;

/// Adapter for the MiniMax image endpoint
pub struct ImageGenerationAdapter {
    generator: Arc<dyn ImageGenerator>,
}

impl std::fmt::Debug for ImageGenerationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageGenerationAdapter").finish_non_exhaustive()
    }
}

impl ImageGenerationAdapter {
    pub fn new(config: InferenceConfig) -> Result<Self, ApplicationError> {
        let client = MiniMaxClient::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::with_generator(Arc::new(client)))
    }

    pub fn with_generator(generator: Arc<dyn ImageGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl ImageGenerationPort for ImageGenerationAdapter {
    #[instrument(skip(self, request), fields(style = %request.style_type))]
    async fn generate_image(
        &self,
        request: ImageRequest,
    ) -> Result<GeneratedImage, ApplicationError> {
        let response = self
            .generator
            .generate_image(ai_core::ImageRequest {
                prompt: request.prompt,
                style: ImageStyle {
                    style_type: request.style_type,
                    style_weight: request.style_weight,
                    aspect_ratio: request.aspect_ratio,
                    prompt_optimizer: request.prompt_optimizer,
                    n: request.count,
                },
            })
            .await
            .map_err(map_inference_error)?;

        let url = response.urls.into_iter().next().ok_or_else(|| {
            ApplicationError::Inference("image response contained no URL".to_string())
        })?;
        Ok(GeneratedImage {
            url,
            trace_id: response.trace_id,
        })
    }
}
