//! Text generation port - Interface for the script and cover-prompt model

use std::{fmt, pin::Pin};

use async_trait::async_trait;
use futures::Stream;

use crate::error::ApplicationError;

/// Incremental text deltas
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ApplicationError>> + Send>>;

/// An open script stream
pub struct ScriptStream {
    /// Trace identifier of the streaming call, when the collaborator sent one
    pub trace_id: Option<String>,
    /// Text deltas; the stream ends when generation completes
    pub deltas: DeltaStream,
}

impl fmt::Debug for ScriptStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptStream")
            .field("trace_id", &self.trace_id)
            .finish_non_exhaustive()
    }
}

/// A complete, non-streaming reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextReply {
    pub content: String,
    pub trace_id: Option<String>,
}

/// Port for text generation
#[async_trait]
pub trait TextGenerationPort: Send + Sync {
    /// Open a streaming generation for `prompt`
    async fn generate_stream(&self, prompt: &str) -> Result<ScriptStream, ApplicationError>;

    /// Generate a complete reply for `prompt`
    async fn generate(&self, prompt: &str) -> Result<TextReply, ApplicationError>;
}
