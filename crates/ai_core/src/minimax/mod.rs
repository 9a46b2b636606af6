//! MiniMax API client

mod client;
mod streaming;

use reqwest::header::HeaderMap;
use serde::Deserialize;

pub use client::MiniMaxClient;

/// Status block MiniMax attaches to every JSON body
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct BaseResp {
    #[serde(default)]
    pub status_code: i64,
    #[serde(default)]
    pub status_msg: String,
}

impl BaseResp {
    pub const fn is_ok(&self) -> bool {
        self.status_code == 0
    }
}

/// Read the `Trace-ID` response header
pub fn trace_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
