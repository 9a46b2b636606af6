//! Image generation port - Interface for cover art rendering

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Image generation request with fixed style parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub style_type: String,
    pub style_weight: f32,
    pub aspect_ratio: String,
    pub prompt_optimizer: bool,
    pub count: u32,
}

/// Result of a successful image generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: String,
    pub trace_id: Option<String>,
}

/// Port for image generation
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ImageGenerationPort: Send + Sync {
    /// Render one image for the request
    async fn generate_image(&self, request: ImageRequest) -> Result<GeneratedImage, ApplicationError>;
}
