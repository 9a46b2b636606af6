//! Speech adapter - Implements SpeechSynthesisPort and VoiceCatalogPort using ai_speech

use std::sync::Arc;

use ai_speech::{
    CloneRequest, MiniMaxSpeechProvider, SpeechChunk, SpeechConfig, SpeechError, TextToSpeech,
    VoiceCatalog, VoiceCloner,
};
use application::{
    error::ApplicationError,
    ports::{
        ClonedVoice, SpeechEvent, SpeechSynthesisPort, SynthesisStream, VoiceCatalogPort,
        VoiceListing,
    },
};
use async_trait::async_trait;
use domain::VoiceId;
use futures::StreamExt;
use tracing::{debug, info, instrument};

/// Adapter for MiniMax speech synthesis, cloning and the voice catalog
pub struct SpeechAdapter {
    tts: Arc<dyn TextToSpeech>,
    cloner: Arc<dyn VoiceCloner>,
    catalog: Arc<dyn VoiceCatalog>,
    clone_sample_text: String,
}

impl std::fmt::Debug for SpeechAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechAdapter")
            .field("provider", &"MiniMaxSpeechProvider")
            .finish_non_exhaustive()
    }
}

impl SpeechAdapter {
    /// Create a new speech adapter
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to initialize.
    pub fn new(config: SpeechConfig) -> Result<Self, ApplicationError> {
        let clone_sample_text = config.clone_sample_text.clone();
        let provider = Arc::new(
            MiniMaxSpeechProvider::new(config)
                .map_err(|e| ApplicationError::Configuration(e.to_string()))?,
        );
        Ok(Self {
            tts: provider.clone(),
            cloner: provider.clone(),
            catalog: provider,
            clone_sample_text,
        })
    }

    /// Assemble an adapter from separate backends
    pub fn from_parts(
        tts: Arc<dyn TextToSpeech>,
        cloner: Arc<dyn VoiceCloner>,
        catalog: Arc<dyn VoiceCatalog>,
        clone_sample_text: impl Into<String>,
    ) -> Self {
        Self {
            tts,
            cloner,
            catalog,
            clone_sample_text: clone_sample_text.into(),
        }
    }

    /// Map speech error to application error
    fn map_error(err: SpeechError) -> ApplicationError {
        match err {
            SpeechError::RateLimited(msg) => ApplicationError::RateLimited(msg),
            SpeechError::Timeout(ms) => ApplicationError::Timeout(ms),
            SpeechError::ConnectionFailed(e) | SpeechError::RequestFailed(e) => {
                ApplicationError::ExternalService(e)
            },
            SpeechError::InvalidAudio(e) | SpeechError::AudioProcessing(e) => {
                ApplicationError::Audio(e)
            },
            other @ SpeechError::SampleTooShort { .. } => ApplicationError::Audio(other.to_string()),
            other @ (SpeechError::SynthesisFailed(_)
            | SpeechError::CloneFailed(_)
            | SpeechError::InvalidResponse(_)
            | SpeechError::ApiError { .. }) => ApplicationError::Speech(other.to_string()),
        }
    }
}

#[async_trait]
impl SpeechSynthesisPort for SpeechAdapter {
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn synthesize_stream(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<SynthesisStream, ApplicationError> {
        let stream = self
            .tts
            .synthesize_stream(text, voice_id)
            .await
            .map_err(Self::map_error)?;

        let events = stream
            .chunks
            .map(|item| match item {
                Ok(SpeechChunk::Audio(bytes)) => Ok(SpeechEvent::Audio(bytes)),
                Ok(SpeechChunk::Complete) => Ok(SpeechEvent::Complete),
                Err(e) => Err(Self::map_error(e)),
            })
            .boxed();

        Ok(SynthesisStream {
            trace_id: stream.trace_id,
            events,
        })
    }
}

#[async_trait]
impl VoiceCatalogPort for SpeechAdapter {
    #[instrument(skip(self))]
    async fn list_voices(&self) -> Result<VoiceListing, ApplicationError> {
        let (voices, trace_id) = self.catalog.list_voices().await.map_err(Self::map_error)?;
        debug!(count = voices.len(), "Voices listed");
        Ok(VoiceListing {
            voice_ids: voices.into_iter().map(|v| v.voice_id).collect(),
            trace_id,
        })
    }

    #[instrument(skip(self, sample), fields(sample_len = sample.len(), voice_id = %voice_id))]
    async fn clone_voice(
        &self,
        sample: Vec<u8>,
        file_name: String,
        voice_id: VoiceId,
    ) -> Result<ClonedVoice, ApplicationError> {
        let result = self
            .cloner
            .clone_voice(CloneRequest {
                audio: sample,
                file_name,
                voice_id: voice_id.as_str().to_string(),
                sample_text: self.clone_sample_text.clone(),
            })
            .await
            .map_err(Self::map_error)?;
        info!(voice_id = %result.voice_id, "Voice cloned");
        Ok(ClonedVoice {
            voice_id: result.voice_id,
            upload_trace_id: result.upload_trace_id,
            clone_trace_id: result.clone_trace_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ai_speech::{CloneResult, SpeechStream, VoiceInfo, VoiceKind};
    use futures::stream;

    use super::*;

    #[derive(Default)]
    struct FakeSpeech {
        clones: Mutex<Vec<CloneRequest>>,
    }

    #[async_trait]
    impl TextToSpeech for FakeSpeech {
        async fn synthesize_stream(
            &self,
            _text: &str,
            voice_id: &str,
        ) -> Result<SpeechStream, SpeechError> {
            if voice_id == "busy_voice" {
                return Err(SpeechError::from_api_status(1002, "rpm exceeded"));
            }
            Ok(SpeechStream {
                trace_id: Some("trace-tts".to_string()),
                chunks: stream::iter(vec![
                    Ok(SpeechChunk::Audio(vec![1, 2])),
                    Err(SpeechError::InvalidAudio("bad hex".to_string())),
                    Ok(SpeechChunk::Complete),
                ])
                .boxed(),
            })
        }
    }

    #[async_trait]
    impl VoiceCloner for FakeSpeech {
        async fn clone_voice(&self, request: CloneRequest) -> Result<CloneResult, SpeechError> {
            let voice_id = request.voice_id.clone();
            self.clones.lock().unwrap().push(request);
            Ok(CloneResult {
                voice_id,
                upload_trace_id: Some("trace-upload".to_string()),
                clone_trace_id: Some("trace-clone".to_string()),
            })
        }
    }

    #[async_trait]
    impl VoiceCatalog for FakeSpeech {
        async fn list_voices(&self) -> Result<(Vec<VoiceInfo>, Option<String>), SpeechError> {
            Ok((
                vec![
                    VoiceInfo {
                        voice_id: "male-qn-qingse".to_string(),
                        name: None,
                        kind: VoiceKind::System,
                    },
                    VoiceInfo {
                        voice_id: "customVoice_abcdefgh_123456".to_string(),
                        name: None,
                        kind: VoiceKind::Cloned,
                    },
                ],
                Some("trace-voices".to_string()),
            ))
        }
    }

    fn adapter() -> (SpeechAdapter, Arc<FakeSpeech>) {
        let fake = Arc::new(FakeSpeech::default());
        let adapter =
            SpeechAdapter::from_parts(fake.clone(), fake.clone(), fake.clone(), "hello there");
        (adapter, fake)
    }

    #[tokio::test]
    async fn synthesis_stream_is_translated() {
        let (adapter, _) = adapter();
        let stream = adapter.synthesize_stream("hi", "voice_a").await.unwrap();
        assert_eq!(stream.trace_id.as_deref(), Some("trace-tts"));

        let items: Vec<_> = stream.events.collect().await;
        assert_eq!(items[0].as_ref().unwrap(), &SpeechEvent::Audio(vec![1, 2]));
        assert!(matches!(items[1], Err(ApplicationError::Audio(_))));
        assert_eq!(items[2].as_ref().unwrap(), &SpeechEvent::Complete);
    }

    #[tokio::test]
    async fn rate_limit_on_open_is_structured() {
        let (adapter, _) = adapter();
        let err = adapter.synthesize_stream("hi", "busy_voice").await.unwrap_err();
        assert!(matches!(err, ApplicationError::RateLimited(_)));
    }

    #[tokio::test]
    async fn listing_flattens_voice_ids() {
        let (adapter, _) = adapter();
        let listing = adapter.list_voices().await.unwrap();
        assert!(listing.contains("customVoice_abcdefgh_123456"));
        assert_eq!(listing.voice_ids.len(), 2);
        assert_eq!(listing.trace_id.as_deref(), Some("trace-voices"));
    }

    #[tokio::test]
    async fn clone_sends_sample_text_and_keeps_traces() {
        let (adapter, fake) = adapter();
        let voice_id = VoiceId::parse("customVoice_abcdefgh_123456").unwrap();

        let cloned = adapter
            .clone_voice(vec![0; 16], "me.wav".to_string(), voice_id)
            .await
            .unwrap();

        assert_eq!(cloned.voice_id, "customVoice_abcdefgh_123456");
        assert_eq!(cloned.upload_trace_id.as_deref(), Some("trace-upload"));
        let clones = fake.clones.lock().unwrap();
        assert_eq!(clones[0].sample_text, "hello there");
        assert_eq!(clones[0].file_name, "me.wav");
    }

    #[test]
    fn error_mapping() {
        assert!(matches!(
            SpeechAdapter::map_error(SpeechError::Timeout(30_000)),
            ApplicationError::Timeout(30_000)
        ));
        assert!(matches!(
            SpeechAdapter::map_error(SpeechError::SampleTooShort {
                duration_ms: 10,
                min_ms: 10_000
            }),
            ApplicationError::Audio(_)
        ));
        assert!(matches!(
            SpeechAdapter::map_error(SpeechError::CloneFailed("duplicate id".to_string())),
            ApplicationError::Speech(_)
        ));
    }
}
