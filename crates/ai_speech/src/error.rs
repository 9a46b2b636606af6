//! Speech processing errors

use thiserror::Error;

/// MiniMax status code signalling a rate limit
const RATE_LIMIT_STATUS: i64 = 1002;

/// Errors that can occur during speech processing
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Failed to connect to speech service
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request to speech service failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Invalid audio format or corrupted data
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    /// Clone sample shorter than the service accepts
    #[error("Audio sample too short: {duration_ms}ms is below the minimum of {min_ms}ms")]
    SampleTooShort {
        /// Duration of the provided audio
        duration_ms: u64,
        /// Minimum accepted duration
        min_ms: u64,
    },

    /// Synthesis failed
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Voice cloning failed
    #[error("Voice clone failed: {0}")]
    CloneFailed(String),

    /// Invalid response from service
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout during processing
    #[error("Speech processing timeout after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Non-zero `base_resp.status_code`
    #[error("API error {code}: {message}")]
    ApiError { code: i64, message: String },

    /// Audio processing/conversion failed
    #[error("Audio processing failed: {0}")]
    AudioProcessing(String),
}

impl SpeechError {
    /// Map a MiniMax status code to an error
    pub fn from_api_status(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        if code == RATE_LIMIT_STATUS {
            Self::RateLimited(message)
        } else {
            Self::ApiError { code, message }
        }
    }

    /// Convert a transport error, recording the timeout that applied
    pub fn from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_ms)
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }

    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_reqwest(&err, 0)
    }
}
