//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Text or image generation error
    #[error("Inference error: {0}")]
    Inference(String),

    /// Speech synthesis or cloning error
    #[error("Speech error: {0}")]
    Speech(String),

    /// Collaborator reported a rate limit
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// External service error
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Collaborator call exceeded its deadline
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// Audio decode, encode or mixing error
    #[error("Audio error: {0}")]
    Audio(String),

    /// Artifact could not be written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Run was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fatal errors that end a generation run without a `complete` event
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No sentence survived parsing and synthesis
    #[error("Empty script: no sentences were produced")]
    EmptyScript,

    /// Batch queue stayed silent past the configured deadline
    #[error("Timed out waiting for the next script batch after {0}ms")]
    QueueTimeout(u64),

    /// Final artifact could not be written
    #[error("Failed to write final artifacts: {0}")]
    Storage(String),

    /// Run was cancelled by the caller
    #[error("Generation cancelled")]
    Cancelled,

    /// Script producer task stopped without its completion marker
    #[error("Script producer stopped unexpectedly: {0}")]
    ProducerCrashed(String),

    /// Stage machine was driven out of order
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Unexpected application failure
    #[error(transparent)]
    Application(ApplicationError),
}

impl From<ApplicationError> for PipelineError {
    fn from(err: ApplicationError) -> Self {
        match err {
            ApplicationError::Cancelled => Self::Cancelled,
            other => Self::Application(other),
        }
    }
}
