//! Streaming chat completion handling

use futures::stream::StreamExt;
use reqwest::Response;
use serde::Deserialize;
use tracing::trace;

use super::BaseResp;
use crate::{
    error::InferenceError,
    ports::{ChunkStream, StreamingChunk},
    sse::{SseLine, sse_lines},
};

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    base_resp: BaseResp,
}

/// Create a content delta stream from an HTTP response
pub fn create_stream(response: Response, timeout_ms: u64) -> ChunkStream {
    let stream = sse_lines(response.bytes_stream()).filter_map(move |line| {
        let item = match line {
            Ok(line) => parse_line(line),
            Err(e) => Some(Err(match InferenceError::from_reqwest(&e, timeout_ms) {
                InferenceError::RequestFailed(msg) => InferenceError::StreamError(msg),
                other => other,
            })),
        };
        futures::future::ready(item)
    });
    Box::pin(stream)
}

/// Parse one SSE line into a delta, an error, or nothing
pub(crate) fn parse_line(line: SseLine) -> Option<Result<StreamingChunk, InferenceError>> {
    match line {
        SseLine::Data(payload) => {
            if payload == "[DONE]" {
                return None;
            }
            trace!(line = %payload, "Parsing stream chunk");
            let Ok(event) = serde_json::from_str::<StreamEvent>(&payload) else {
                trace!("Skipping non-JSON data line");
                return None;
            };
            if let Some(base) = event.base_resp.filter(|b| !b.is_ok()) {
                return Some(Err(InferenceError::from_api_status(
                    base.status_code,
                    base.status_msg,
                )));
            }
            let choice = event.choices.into_iter().next()?;
            let done = choice.finish_reason.is_some();
            let content = choice.delta.and_then(|d| d.content).unwrap_or_default();
            if content.is_empty() {
                return None;
            }
            Some(Ok(StreamingChunk { content, done }))
        },
        SseLine::Other(text) => serde_json::from_str::<ErrorEnvelope>(&text)
            .ok()
            .filter(|e| !e.base_resp.is_ok())
            .map(|e| {
                Err(InferenceError::from_api_status(
                    e.base_resp.status_code,
                    e.base_resp.status_msg,
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(json: &str) -> SseLine {
        SseLine::Data(json.to_string())
    }

    #[test]
    fn parses_delta_content() {
        let chunk = parse_line(data(r#"{"choices":[{"delta":{"content":"Speaker1: 你好"}}]}"#))
            .unwrap()
            .unwrap();
        assert_eq!(chunk.content, "Speaker1: 你好");
        assert!(!chunk.done);
    }

    #[test]
    fn final_message_without_delta_is_skipped() {
        let line = data(
            r#"{"choices":[{"finish_reason":"stop","message":{"content":"full text"}}]}"#,
        );
        assert!(parse_line(line).is_none());
    }

    #[test]
    fn empty_delta_is_skipped() {
        assert!(parse_line(data(r#"{"choices":[{"delta":{}}]}"#)).is_none());
    }

    #[test]
    fn invalid_json_is_skipped() {
        assert!(parse_line(data("not json")).is_none());
        assert!(parse_line(data("[DONE]")).is_none());
    }

    #[test]
    fn base_resp_error_in_data_line() {
        let result = parse_line(data(
            r#"{"choices":[],"base_resp":{"status_code":1002,"status_msg":"rate limit"}}"#,
        ))
        .unwrap();
        assert!(result.unwrap_err().is_rate_limited());
    }

    #[test]
    fn plain_json_error_body() {
        let result = parse_line(SseLine::Other(
            r#"{"base_resp":{"status_code":1004,"status_msg":"auth"}}"#.to_string(),
        ))
        .unwrap();
        assert!(matches!(
            result,
            Err(InferenceError::ApiError { code: 1004, .. })
        ));
    }

    #[test]
    fn ok_status_in_other_line_is_ignored() {
        assert!(
            parse_line(SseLine::Other(
                r#"{"base_resp":{"status_code":0,"status_msg":"success"}}"#.to_string()
            ))
            .is_none()
        );
    }
}
