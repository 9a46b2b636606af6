//! Port definitions for the inference client
//!
//! Defines the traits that text and image generation backends implement.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Name MiniMax expects on the system message
const SYSTEM_NAME: &str = "MiniMax AI";

/// A chat message in MiniMax format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InferenceMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Request for a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// Messages in the conversation
    pub messages: Vec<InferenceMessage>,
    /// Model to use (overrides config default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Per-request timeout override in milliseconds
    #[serde(skip)]
    pub timeout_ms: Option<u64>,
}

impl InferenceRequest {
    /// Single user prompt preceded by the named system message
    pub fn prompt(user: impl Into<String>) -> Self {
        Self {
            messages: vec![
                InferenceMessage {
                    role: "system".to_string(),
                    name: Some(SYSTEM_NAME.to_string()),
                    content: None,
                },
                InferenceMessage {
                    role: "user".to_string(),
                    name: None,
                    content: Some(user.into()),
                },
            ],
            model: None,
            timeout_ms: None,
        }
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Response from a non-streaming completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResponse {
    pub content: String,
    pub model: String,
    pub trace_id: Option<String>,
}

/// One content delta of a streaming completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingChunk {
    pub content: String,
    pub done: bool,
}

/// Boxed stream of content deltas
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamingChunk, InferenceError>> + Send>>;

/// A started streaming completion
pub struct StreamingResponse {
    /// Trace id from the response headers
    pub trace_id: Option<String>,
    pub chunks: ChunkStream,
}

impl std::fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("trace_id", &self.trace_id)
            .finish_non_exhaustive()
    }
}

/// Trait for chat completion backends
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Generate a full reply
    async fn generate(&self, request: InferenceRequest)
    -> Result<InferenceResponse, InferenceError>;

    /// Start a streaming reply
    async fn generate_stream(
        &self,
        request: InferenceRequest,
    ) -> Result<StreamingResponse, InferenceError>;

    /// Model used when the request names none
    fn default_model(&self) -> &str;
}

/// Fixed style parameters of an image request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageStyle {
    pub style_type: String,
    pub style_weight: f32,
    pub aspect_ratio: String,
    pub prompt_optimizer: bool,
    pub n: u32,
}

impl Default for ImageStyle {
    fn default() -> Self {
        Self {
            style_type: "漫画".to_string(),
            style_weight: 1.0,
            aspect_ratio: "1:1".to_string(),
            prompt_optimizer: true,
            n: 1,
        }
    }
}

/// Image generation request
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub style: ImageStyle,
}

/// Image generation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResponse {
    pub urls: Vec<String>,
    pub trace_id: Option<String>,
}

/// Trait for image generation backends
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, InferenceError>;
}
