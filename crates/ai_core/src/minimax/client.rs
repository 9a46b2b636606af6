//! MiniMax HTTP client for chat completion and image generation

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{BaseResp, streaming::create_stream, trace_id_from_headers};
use crate::{
    config::InferenceConfig,
    error::InferenceError,
    ports::{
        ImageGenerator, ImageRequest, ImageResponse, InferenceEngine, InferenceMessage,
        InferenceRequest, InferenceResponse, StreamingResponse,
    },
};

/// Client for the MiniMax text and image endpoints
pub struct MiniMaxClient {
    client: Client,
    config: InferenceConfig,
}

impl fmt::Debug for MiniMaxClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiniMaxClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MiniMaxClient {
    /// Create a new client
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .build()
            .map_err(|e| InferenceError::ConnectionFailed(e.to_string()))?;

        if !config.has_credentials() {
            warn!("MiniMax API key is empty; requests will be rejected");
        }

        info!(
            base_url = %config.base_url,
            model = %config.text_model,
            "Initialized MiniMax client"
        );

        Ok(Self { client, config })
    }

    /// Build the API URL for a given endpoint
    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    fn resolve_model(&self, request: &InferenceRequest) -> String {
        request
            .model
            .clone()
            .unwrap_or_else(|| self.config.text_model.clone())
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &T,
        timeout_ms: u64,
    ) -> Result<Response, InferenceError> {
        let response = self
            .client
            .post(self.api_url(endpoint))
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_millis(timeout_ms))
            .json(body)
            .send()
            .await
            .map_err(|e| InferenceError::from_reqwest(&e, timeout_ms))?;
        check_status(response).await
    }
}

/// Reject non-success HTTP statuses, mapping 429 to a rate limit
async fn check_status(response: Response) -> Result<Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "MiniMax request failed");
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(InferenceError::RateLimited(format!("Status {status}: {body}")));
    }
    Err(InferenceError::ServerError(format!("Status {status}: {body}")))
}

fn check_base_resp(base: Option<BaseResp>) -> Result<(), InferenceError> {
    match base {
        Some(base) if !base.is_ok() => Err(InferenceError::from_api_status(
            base.status_code,
            base.status_msg,
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: String,
    messages: &'a [InferenceMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessageBody>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageBody {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    style_type: &'a str,
    style_weight: f32,
    aspect_ratio: &'a str,
    prompt_optimizer: bool,
    n: u32,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

/// Image URLs come either as `data.image_urls` or as `data[].url`
fn extract_image_urls(data: Option<&Value>) -> Vec<String> {
    match data {
        Some(Value::Object(map)) => map
            .get("image_urls")
            .and_then(Value::as_array)
            .map(|urls| {
                urls.iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("url").and_then(Value::as_str))
            .map(ToString::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl InferenceEngine for MiniMaxClient {
    #[instrument(skip(self, request), fields(model = %self.resolve_model(&request)))]
    async fn generate(
        &self,
        request: InferenceRequest,
    ) -> Result<InferenceResponse, InferenceError> {
        let model = self.resolve_model(&request);
        let timeout_ms = request.timeout_ms.unwrap_or(self.config.prompt_timeout_ms);
        let body = ChatRequest {
            model: model.clone(),
            messages: &request.messages,
            stream: false,
        };

        debug!("Sending chat completion request");
        let response = self
            .post_json("text/chatcompletion_v2", &body, timeout_ms)
            .await?;
        let trace_id = trace_id_from_headers(response.headers());

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;
        check_base_resp(parsed.base_resp)?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        debug!(trace_id = ?trace_id, chars = content.chars().count(), "Chat completion finished");

        Ok(InferenceResponse {
            content,
            model: parsed.model.unwrap_or(model),
            trace_id,
        })
    }

    #[instrument(skip(self, request), fields(model = %self.resolve_model(&request)))]
    async fn generate_stream(
        &self,
        request: InferenceRequest,
    ) -> Result<StreamingResponse, InferenceError> {
        let timeout_ms = request.timeout_ms.unwrap_or(self.config.script_timeout_ms);
        let body = ChatRequest {
            model: self.resolve_model(&request),
            messages: &request.messages,
            stream: true,
        };

        debug!("Starting streaming chat completion");
        let response = self
            .post_json("text/chatcompletion_v2", &body, timeout_ms)
            .await?;
        let trace_id = trace_id_from_headers(response.headers());
        info!(trace_id = ?trace_id, "Script stream opened");

        Ok(StreamingResponse {
            trace_id,
            chunks: create_stream(response, timeout_ms),
        })
    }

    fn default_model(&self) -> &str {
        &self.config.text_model
    }
}

#[async_trait]
impl ImageGenerator for MiniMaxClient {
    #[instrument(skip(self, request), fields(model = %self.config.image_model))]
    async fn generate_image(&self, request: ImageRequest) -> Result<ImageResponse, InferenceError> {
        let body = ImageGenerationRequest {
            model: &self.config.image_model,
            prompt: &request.prompt,
            style_type: &request.style.style_type,
            style_weight: request.style.style_weight,
            aspect_ratio: &request.style.aspect_ratio,
            prompt_optimizer: request.style.prompt_optimizer,
            n: request.style.n,
            response_format: "url",
        };

        let response = self
            .post_json("image_generation", &body, self.config.image_timeout_ms)
            .await?;
        let trace_id = trace_id_from_headers(response.headers());

        let parsed: ImageGenerationResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::InvalidResponse(e.to_string()))?;
        check_base_resp(parsed.base_resp)?;

        let urls = extract_image_urls(parsed.data.as_ref());
        if urls.is_empty() {
            return Err(InferenceError::InvalidResponse(
                "image response contained no URL".to_string(),
            ));
        }

        info!(trace_id = ?trace_id, count = urls.len(), "Image generated");
        Ok(ImageResponse { urls, trace_id })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn api_url_joins_cleanly() {
        let client = MiniMaxClient::new(InferenceConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            client.api_url("/text/chatcompletion_v2"),
            "http://localhost:9000/v1/text/chatcompletion_v2"
        );
    }

    #[test]
    fn request_model_overrides_default() {
        let client = MiniMaxClient::new(InferenceConfig::default()).unwrap();
        let request = InferenceRequest::prompt("x").with_model("other");
        assert_eq!(client.resolve_model(&request), "other");
        assert_eq!(
            client.resolve_model(&InferenceRequest::prompt("x")),
            "MiniMax-M1"
        );
    }

    #[test]
    fn image_urls_from_object_shape() {
        let data = json!({"image_urls": ["http://a", "http://b"]});
        assert_eq!(
            extract_image_urls(Some(&data)),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
    }

    #[test]
    fn image_urls_from_array_shape() {
        let data = json!([{"url": "http://a"}, {"other": 1}]);
        assert_eq!(extract_image_urls(Some(&data)), vec!["http://a".to_string()]);
    }

    #[test]
    fn image_urls_missing() {
        assert!(extract_image_urls(None).is_empty());
        assert!(extract_image_urls(Some(&json!("x"))).is_empty());
    }

    #[test]
    fn base_resp_check() {
        assert!(check_base_resp(None).is_ok());
        assert!(
            check_base_resp(Some(BaseResp {
                status_code: 1002,
                status_msg: "limit".to_string()
            }))
            .unwrap_err()
            .is_rate_limited()
        );
    }
}
