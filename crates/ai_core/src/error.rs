//! Inference errors

use thiserror::Error;

/// MiniMax status code signalling a rate limit
pub const RATE_LIMIT_STATUS: i64 = 1002;

/// Errors that can occur during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Failed to connect to inference server
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request to inference server failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout during inference
    #[error("Inference timeout after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Server error
    #[error("Server error: {0}")]
    ServerError(String),

    /// Non-zero `base_resp.status_code`
    #[error("API error {code}: {message}")]
    ApiError { code: i64, message: String },

    /// Streaming error
    #[error("Stream error: {0}")]
    StreamError(String),
}

impl InferenceError {
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

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_reqwest(&err, 0)
    }
}
