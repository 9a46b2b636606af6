//! Text generation adapter - Implements TextGenerationPort using ai_core

use std::sync::Arc;

use ai_core::{InferenceConfig, InferenceEngine, InferenceError, InferenceRequest, MiniMaxClient};
use application::{
    error::ApplicationError,
    ports::{ScriptStream, TextGenerationPort, TextReply},
};
use async_trait::async_trait;
use futures::{StreamExt, future};
use tracing::{debug, instrument};

/// Adapter for the MiniMax chat completion endpoint
pub struct TextGenerationAdapter {
    engine: Arc<dyn InferenceEngine>,
}

impl std::fmt::Debug for TextGenerationAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextGenerationAdapter")
            .field("model", &self.engine.default_model())
            .finish_non_exhaustive()
    }
}

/// Map an inference error to an application error
///
/// Rate limits and timeouts keep their structure so the retry unit can
/// classify them without inspecting the message.
pub fn map_inference_error(err: InferenceError) -> ApplicationError {
    match err {
        InferenceError::RateLimited(msg) => ApplicationError::RateLimited(msg),
        InferenceError::Timeout(ms) => ApplicationError::Timeout(ms),
        InferenceError::ConnectionFailed(e)
        | InferenceError::RequestFailed(e)
        | InferenceError::ServerError(e) => ApplicationError::ExternalService(e),
        other @ (InferenceError::InvalidResponse(_)
        | InferenceError::ApiError { .. }
        | InferenceError::StreamError(_)) => ApplicationError::Inference(other.to_string()),
    }
}

impl TextGenerationAdapter {
    /// Create an adapter backed by a new MiniMax client
    pub fn new(config: InferenceConfig) -> Result<Self, ApplicationError> {
        let client = MiniMaxClient::new(config)
            .map_err(|e| ApplicationError::Configuration(e.to_string()))?;
        Ok(Self::with_engine(Arc::new(client)))
    }

    /// Create an adapter over any inference engine
    pub fn with_engine(engine: Arc<dyn InferenceEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl TextGenerationPort for TextGenerationAdapter {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate_stream(&self, prompt: &str) -> Result<ScriptStream, ApplicationError> {
        let response = self
            .engine
            .generate_stream(InferenceRequest::prompt(prompt))
            .await
            .map_err(map_inference_error)?;
        debug!(trace_id = ?response.trace_id, "Script stream opened");

        let deltas = response
            .chunks
            .filter_map(|item| {
                future::ready(match item {
                    Ok(chunk) if chunk.content.is_empty() => None,
                    Ok(chunk) => Some(Ok(chunk.content)),
                    Err(e) => Some(Err(map_inference_error(e))),
                })
            })
            .boxed();

        Ok(ScriptStream {
            trace_id: response.trace_id,
            deltas,
        })
    }

    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<TextReply, ApplicationError> {
        let response = self
            .engine
            .generate(InferenceRequest::prompt(prompt))
            .await
            .map_err(map_inference_error)?;
        Ok(TextReply {
            content: response.content,
            trace_id: response.trace_id,
        })
    }
}
