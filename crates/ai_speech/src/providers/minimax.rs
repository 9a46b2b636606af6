//! MiniMax speech provider
//!
//! Streaming TTS over `/v1/t2a_v2`, voice cloning through a file upload
//! followed by `/v1/voice_clone`, and voice listing through `/v1/get_voice`.

use std::{fmt, time::Duration};

use ai_core::{
    BaseResp,
    sse::{SseLine, sse_lines},
    trace_id_from_headers,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{
    Client, Response, StatusCode,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, trace, warn};

use crate::{
    config::SpeechConfig,
    error::SpeechError,
    ports::{TextToSpeech, VoiceCatalog, VoiceCloner},
    types::{
        AudioFormat, CloneRequest, CloneResult, SpeechChunk, SpeechStream, VoiceInfo, VoiceKind,
    },
};

/// MiniMax speech provider
pub struct MiniMaxSpeechProvider {
    client: Client,
    config: SpeechConfig,
}

impl fmt::Debug for MiniMaxSpeechProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiniMaxSpeechProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct VoiceSetting<'a> {
    voice_id: &'a str,
    speed: f32,
    vol: f32,
    pitch: i32,
}

#[derive(Debug, Serialize)]
struct AudioSetting {
    sample_rate: u32,
    bitrate: u32,
    format: AudioFormat,
    channel: u8,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    text: &'a str,
    stream: bool,
    voice_setting: VoiceSetting<'a>,
    audio_setting: AudioSetting,
    subtitle_enable: bool,
}

#[derive(Debug, Deserialize)]
struct TtsEvent {
    #[serde(default)]
    data: Option<TtsData>,
    #[serde(default)]
    extra_info: Option<Value>,
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct TtsData {
    #[serde(default)]
    audio: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    file: Option<UploadedFile>,
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    #[serde(default)]
    file_id: Option<Value>,
}

#[derive(Debug, Serialize)]
struct CloneBody<'a> {
    file_id: &'a Value,
    voice_id: &'a str,
    text: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct VoiceListResponse {
    #[serde(default)]
    system_voice: Option<Vec<VoiceEntry>>,
    #[serde(default)]
    voice_cloning: Option<Vec<VoiceEntry>>,
    #[serde(default)]
    voice_generation: Option<Vec<VoiceEntry>>,
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    #[serde(default)]
    voice_name: Option<String>,
}

fn check_base_resp(base: Option<BaseResp>) -> Result<(), SpeechError> {
    match base {
        Some(base) if !base.is_ok() => Err(SpeechError::from_api_status(
            base.status_code,
            base.status_msg,
        )),
        _ => Ok(()),
    }
}

/// Reject non-success HTTP statuses, mapping 429 to a rate limit
async fn check_status(response: Response) -> Result<Response, SpeechError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "MiniMax speech request failed");
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SpeechError::RateLimited(format!("Status {status}: {body}")));
    }
    Err(SpeechError::RequestFailed(format!("Status {status}: {body}")))
}

/// Parse one TTS SSE line into an audio chunk, an error, or nothing
///
/// The final event repeats the whole utterance alongside `extra_info` and is
/// skipped so audio is not duplicated.
pub(crate) fn parse_tts_line(line: SseLine) -> Option<Result<SpeechChunk, SpeechError>> {
    match line {
        SseLine::Data(payload) => {
            trace!(len = payload.len(), "Parsing TTS chunk");
            let Ok(event) = serde_json::from_str::<TtsEvent>(&payload) else {
                return None;
            };
            if let Err(e) = check_base_resp(event.base_resp) {
                return Some(Err(e));
            }
            if event.extra_info.is_some() {
                return None;
            }
            let audio_hex = event.data.and_then(|d| d.audio).filter(|a| !a.is_empty())?;
            Some(
                hex::decode(audio_hex.trim())
                    .map(SpeechChunk::Audio)
                    .map_err(|e| SpeechError::InvalidAudio(format!("bad hex audio chunk: {e}"))),
            )
        },
        SseLine::Other(text) => serde_json::from_str::<StatusEnvelope>(&text)
            .ok()
            .and_then(|env| check_base_resp(env.base_resp).err())
            .map(Err),
    }
}

fn file_id_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl MiniMaxSpeechProvider {
    /// Create a new provider
    pub fn new(config: SpeechConfig) -> Result<Self, SpeechError> {
        let client = Client::builder()
            .build()
            .map_err(|e| SpeechError::ConnectionFailed(e.to_string()))?;

        if !config.has_credentials() {
            warn!("MiniMax speech API key is empty; requests will be rejected");
        }

        info!(
            base_url = %config.base_url,
            model = %config.tts_model,
            "Initialized MiniMax speech provider"
        );

        Ok(Self { client, config })
    }

    /// Access the configuration
    pub const fn config(&self) -> &SpeechConfig {
        &self.config
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn post_json<T: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &T,
        timeout_ms: u64,
    ) -> Result<Response, SpeechError> {
        let response = self
            .client
            .post(self.api_url(endpoint))
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_millis(timeout_ms))
            .json(body)
            .send()
            .await
            .map_err(|e| SpeechError::from_reqwest(&e, timeout_ms))?;
        check_status(response).await
    }

    #[instrument(skip(self, request), fields(file_name = %request.file_name))]
    async fn upload_sample(
        &self,
        request: &CloneRequest,
    ) -> Result<(Value, Option<String>), SpeechError> {
        let mime = AudioFormat::from_file_name(&request.file_name)
            .unwrap_or(AudioFormat::Wav)
            .mime_type();
        let part = Part::bytes(request.audio.clone())
            .file_name(request.file_name.clone())
            .mime_str(mime)
            .map_err(|e| SpeechError::InvalidAudio(e.to_string()))?;
        let form = Form::new().text("purpose", "voice_clone").part("file", part);

        let timeout_ms = self.config.clone_timeout_ms;
        let response = self
            .client
            .post(self.api_url("files/upload"))
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_millis(timeout_ms))
            .multipart(form)
            .send()
            .await
            .map_err(|e| SpeechError::from_reqwest(&e, timeout_ms))?;
        let response = check_status(response).await?;
        let trace_id = trace_id_from_headers(response.headers());

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::InvalidResponse(e.to_string()))?;
        check_base_resp(parsed.base_resp)?;

        let file_id = parsed
            .file
            .and_then(|f| f.file_id)
            .filter(|id| file_id_label(id).is_some())
            .ok_or_else(|| SpeechError::CloneFailed("upload returned no file_id".to_string()))?;

        debug!(file_id = ?file_id_label(&file_id), trace_id = ?trace_id, "Clone sample uploaded");
        Ok((file_id, trace_id))
    }
}

#[async_trait]
impl TextToSpeech for MiniMaxSpeechProvider {
    #[instrument(skip(self, text, voice_id), fields(voice_id = %voice_id, chars = text.chars().count()))]
    async fn synthesize_stream(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<SpeechStream, SpeechError> {
        let body = TtsRequest {
            model: &self.config.tts_model,
            text,
            stream: true,
            voice_setting: VoiceSetting {
                voice_id,
                speed: self.config.speed,
                vol: self.config.volume,
                pitch: self.config.pitch,
            },
            audio_setting: AudioSetting {
                sample_rate: self.config.sample_rate,
                bitrate: self.config.bitrate,
                format: self.config.format,
                channel: self.config.channels,
            },
            subtitle_enable: false,
        };

        let timeout_ms = self.config.timeout_ms;
        let response = self.post_json("t2a_v2", &body, timeout_ms).await?;
        let trace_id = trace_id_from_headers(response.headers());
        debug!(trace_id = ?trace_id, "TTS stream opened");

        let chunks = sse_lines(response.bytes_stream())
            .filter_map(move |line| {
                futures::future::ready(match line {
                    Ok(line) => parse_tts_line(line),
                    Err(e) => Some(Err(SpeechError::from_reqwest(&e, timeout_ms))),
                })
            })
            .chain(stream::once(async { Ok(SpeechChunk::Complete) }));

        Ok(SpeechStream {
            trace_id,
            chunks: Box::pin(chunks),
        })
    }
}

#[async_trait]
impl VoiceCloner for MiniMaxSpeechProvider {
    #[instrument(skip(self, request), fields(voice_id = %request.voice_id))]
    async fn clone_voice(&self, request: CloneRequest) -> Result<CloneResult, SpeechError> {
        let (file_id, upload_trace_id) = self.upload_sample(&request).await?;

        let body = CloneBody {
            file_id: &file_id,
            voice_id: &request.voice_id,
            text: &request.sample_text,
            model: &self.config.clone_model,
        };
        let response = self
            .post_json("voice_clone", &body, self.config.clone_timeout_ms)
            .await?;
        let clone_trace_id = trace_id_from_headers(response.headers());

        let parsed: StatusEnvelope = response
            .json()
            .await
            .map_err(|e| SpeechError::InvalidResponse(e.to_string()))?;
        check_base_resp(parsed.base_resp).map_err(|e| match e {
            SpeechError::ApiError { code, message } => {
                SpeechError::CloneFailed(format!("{code}: {message}"))
            },
            other => other,
        })?;

        info!(voice_id = %request.voice_id, "Voice cloned");
        Ok(CloneResult {
            voice_id: request.voice_id,
            upload_trace_id,
            clone_trace_id,
        })
    }
}

#[async_trait]
impl VoiceCatalog for MiniMaxSpeechProvider {
    #[instrument(skip(self))]
    async fn list_voices(&self) -> Result<(Vec<VoiceInfo>, Option<String>), SpeechError> {
        let body = serde_json::json!({"voice_type": "all"});
        let response = self
            .post_json("get_voice", &body, self.config.timeout_ms)
            .await?;
        let trace_id = trace_id_from_headers(response.headers());

        let parsed: VoiceListResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::InvalidResponse(e.to_string()))?;
        check_base_resp(parsed.base_resp)?;

        let groups = [
            (parsed.system_voice, VoiceKind::System),
            (parsed.voice_cloning, VoiceKind::Cloned),
            (parsed.voice_generation, VoiceKind::Generated),
        ];
        let voices: Vec<VoiceInfo> = groups
            .into_iter()
            .flat_map(|(entries, kind)| {
                entries.unwrap_or_default().into_iter().map(move |e| VoiceInfo {
                    voice_id: e.voice_id,
                    name: e.voice_name,
                    kind,
                })
            })
            .collect();

        info!(count = voices.len(), trace_id = ?trace_id, "Listed voices");
        Ok((voices, trace_id))
    }
}
