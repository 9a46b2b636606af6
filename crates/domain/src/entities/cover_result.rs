//! Outcome of the cover art task

use serde::{Deserialize, Serialize};

/// Cover image result, produced once per run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverResult {
    pub success: bool,
    pub image_url: String,
    pub prompt: String,
    pub prompt_trace_id: Option<String>,
    pub image_trace_id: Option<String>,
    pub message: String,
}

impl CoverResult {
    pub fn success(
        image_url: impl Into<String>,
        prompt: impl Into<String>,
        prompt_trace_id: Option<String>,
        image_trace_id: Option<String>,
    ) -> Self {
        Self {
            success: true,
            image_url: image_url.into(),
            prompt: prompt.into(),
            prompt_trace_id,
            image_trace_id,
            message: "cover generated".to_string(),
        }
    }

    /// Failed at either stage; the prompt is kept when it was produced
    pub fn failure(
        message: impl Into<String>,
        prompt: impl Into<String>,
        prompt_trace_id: Option<String>,
        image_trace_id: Option<String>,
    ) -> Self {
        Self {
            success: false,
            image_url: String::new(),
            prompt: prompt.into(),
            prompt_trace_id,
            image_trace_id,
            message: message.into(),
        }
    }
}
