//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Voice identifier breaks the format rules
    #[error("Invalid voice id '{id}': {reasons}")]
    InvalidVoiceId { id: String, reasons: String },

    /// Default voice name is not in the static table
    #[error("Unknown default voice: {0}")]
    UnknownDefaultVoice(String),

    /// Session identifier contains unsupported characters
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    /// Two audio clips with different sample rates cannot be joined
    #[error("Sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    /// Pipeline stage transition is not allowed
    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// Validation failed
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Create an invalid voice id error from a list of rule violations
    pub fn invalid_voice_id(id: impl Into<String>, reasons: &[String]) -> Self {
        Self::InvalidVoiceId {
            id: id.into(),
            reasons: reasons.join(", "),
        }
    }
}
