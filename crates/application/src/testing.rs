//! Hand-written fakes for the stream-returning ports
//!
//! Request/response ports are mocked with `mockall`; the streaming ports
//! and the stateful collaborators are easier to script by hand.

#![allow(clippy::unwrap_used)]

use std::{
    collections::{HashMap, VecDeque},
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

use async_trait::async_trait;
use domain::{AudioClip, SessionId};
use futures::stream;

use crate::{
    error::ApplicationError,
    ports::{
        ArtifactRef, ArtifactStorePort, AudioCodecPort, ScriptStream, SpeechEvent,
        SpeechEventStream, SpeechSynthesisPort, SynthesisStream, TextGenerationPort, TextReply,
    },
};

/// Sample rate of [`FakeCodec`] clips; one byte of audio is one millisecond
pub const FAKE_RATE: u32 = 1000;

/// Behaviour of one synthesis attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceScript {
    /// Streams the voice id as audio, then completes
    Speaks,
    /// Stream yields a typed rate-limit error
    RateLimited,
    /// Opening the stream fails
    Fails,
    /// Completes without audio
    Silent,
    /// Never yields anything
    Hangs,
}

/// Scripted speech synthesizer
///
/// Each voice replays its script in order and repeats the last entry.
/// Voices without a script always speak.
#[derive(Debug, Default)]
pub struct ScriptedSpeech {
    scripts: Mutex<HashMap<String, VecDeque<VoiceScript>>>,
    calls: Mutex<Vec<(String, String)>>,
    traces: AtomicU32,
}

impl ScriptedSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice(self, voice_id: &str, script: Vec<VoiceScript>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(voice_id.to_string(), script.into());
        self
    }

    /// `(text, voice_id)` of every attempt so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn next_script(&self, voice_id: &str) -> VoiceScript {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(voice_id) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(VoiceScript::Speaks),
            Some(queue) => queue.front().copied().unwrap_or(VoiceScript::Speaks),
            None => VoiceScript::Speaks,
        }
    }
}

#[async_trait]
impl SpeechSynthesisPort for ScriptedSpeech {
    async fn synthesize_stream(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<SynthesisStream, ApplicationError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.to_string()));
        let n = self.traces.fetch_add(1, Ordering::SeqCst);
        let trace_id = Some(format!("tts-trace-{n}"));

        let events: SpeechEventStream = match self.next_script(voice_id) {
            VoiceScript::Fails => {
                return Err(ApplicationError::Speech(format!(
                    "voice {voice_id} not found"
                )));
            },
            VoiceScript::Speaks => {
                let bytes = voice_id.as_bytes();
                let (head, tail) = bytes.split_at(bytes.len() / 2);
                Box::pin(stream::iter(vec![
                    Ok(SpeechEvent::Audio(head.to_vec())),
                    Ok(SpeechEvent::Audio(tail.to_vec())),
                    Ok(SpeechEvent::Complete),
                ]))
            },
            VoiceScript::RateLimited => Box::pin(stream::iter(vec![Err(
                ApplicationError::RateLimited("rpm exceeded".to_string()),
            )])),
            VoiceScript::Silent => Box::pin(stream::iter(vec![Ok(SpeechEvent::Complete)])),
            VoiceScript::Hangs => Box::pin(stream::pending::<Result<SpeechEvent, ApplicationError>>()),
        };
        Ok(SynthesisStream { trace_id, events })
    }
}

/// One element of a scripted text stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    Text(String),
    Fail(String),
}

/// Scripted text generator
#[derive(Debug, Clone, Default)]
pub struct ScriptedText {
    deltas: Vec<Delta>,
    hang_at_end: bool,
    fail_open: bool,
    reply: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedText {
    /// Stream each line followed by a newline as its own delta
    pub fn lines(lines: &[&str]) -> Self {
        Self {
            deltas: lines.iter().map(|l| Delta::Text(format!("{l}\n"))).collect(),
            reply: Some("Two hosts chatting in a studio".to_string()),
            ..Self::default()
        }
    }

    /// Stream raw deltas verbatim
    pub fn chunks(chunks: &[&str]) -> Self {
        Self {
            deltas: chunks.iter().map(|c| Delta::Text((*c).to_string())).collect(),
            reply: Some("Two hosts chatting in a studio".to_string()),
            ..Self::default()
        }
    }

    pub fn then_fail(mut self, message: &str) -> Self {
        self.deltas.push(Delta::Fail(message.to_string()));
        self
    }

    pub fn then_hang(mut self) -> Self {
        self.hang_at_end = true;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.reply = Some(reply.to_string());
        self
    }

    pub fn failing_reply(mut self) -> Self {
        self.reply = None;
        self
    }

    /// Prompts seen by one-shot `generate`; clones share the record
    pub fn reply_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerationPort for ScriptedText {
    async fn generate_stream(&self, _prompt: &str) -> Result<ScriptStream, ApplicationError> {
        if self.fail_open {
            return Err(ApplicationError::Inference("model unavailable".to_string()));
        }
        let items: Vec<Result<String, ApplicationError>> = self
            .deltas
            .iter()
            .map(|d| match d {
                Delta::Text(text) => Ok(text.clone()),
                Delta::Fail(message) => Err(ApplicationError::Inference(message.clone())),
            })
            .collect();
        let head = stream::iter(items);
        let deltas: crate::ports::DeltaStream = if self.hang_at_end {
            Box::pin(futures::StreamExt::chain(head, stream::pending()))
        } else {
            Box::pin(head)
        };
        Ok(ScriptStream {
            trace_id: Some("script-trace".to_string()),
            deltas,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<TextReply, ApplicationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.as_ref().map_or_else(
            || Err(ApplicationError::Inference("model overloaded".to_string())),
            |content| {
                Ok(TextReply {
                    content: content.clone(),
                    trace_id: Some("prompt-trace".to_string()),
                })
            },
        )
    }
}

/// Codec where one byte decodes to one sample at [`FAKE_RATE`]
///
/// Paths containing `missing` fail to load; other paths load 500 ms of tone.
#[derive(Debug, Default)]
pub struct FakeCodec;

#[async_trait]
impl AudioCodecPort for FakeCodec {
    async fn decode(&self, bytes: &[u8]) -> Result<AudioClip, ApplicationError> {
        if bytes.is_empty() {
            return Err(ApplicationError::Audio("empty input".to_string()));
        }
        Ok(AudioClip::new(
            bytes.iter().map(|b| 1000 + i16::from(*b) * 16).collect(),
            FAKE_RATE,
        ))
    }

    async fn load(&self, path: &Path) -> Result<AudioClip, ApplicationError> {
        if path.to_string_lossy().contains("missing") {
            return Err(ApplicationError::Audio(format!(
                "cannot open {}",
                path.display()
            )));
        }
        Ok(AudioClip::new(vec![4000; 500], FAKE_RATE))
    }

    async fn encode(&self, clip: &AudioClip) -> Result<Vec<u8>, ApplicationError> {
        Ok(clip.samples().iter().flat_map(|s| s.to_le_bytes()).collect())
    }

    fn sample_rate(&self) -> u32 {
        FAKE_RATE
    }
}

/// In-memory artifact store
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<Vec<usize>>,
    final_audio: Mutex<Option<Vec<u8>>>,
    transcript: Mutex<Option<String>>,
    fail_final: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_final() -> Self {
        Self {
            fail_final: true,
            ..Self::default()
        }
    }

    /// Byte length of every snapshot written so far
    pub fn snapshots(&self) -> Vec<usize> {
        self.snapshots.lock().unwrap().clone()
    }

    pub fn final_audio(&self) -> Option<Vec<u8>> {
        self.final_audio.lock().unwrap().clone()
    }

    pub fn transcript(&self) -> Option<String> {
        self.transcript.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStorePort for MemoryStore {
    async fn write_snapshot(
        &self,
        session: &SessionId,
        audio: Vec<u8>,
    ) -> Result<ArtifactRef, ApplicationError> {
        let mut snapshots = self.snapshots.lock().unwrap();
        snapshots.push(audio.len());
        let name = format!("progressive_{session}.mp3");
        Ok(ArtifactRef {
            url: format!("/download/audio/{name}?t={}", snapshots.len()),
            path: name.into(),
        })
    }

    async fn write_final_audio(
        &self,
        session: &SessionId,
        audio: Vec<u8>,
    ) -> Result<ArtifactRef, ApplicationError> {
        if self.fail_final {
            return Err(ApplicationError::Storage("disk full".to_string()));
        }
        *self.final_audio.lock().unwrap() = Some(audio);
        let name = format!("podcast_{session}_0.mp3");
        Ok(ArtifactRef {
            url: format!("/download/audio/{name}"),
            path: name.into(),
        })
    }

    async fn write_transcript(
        &self,
        session: &SessionId,
        transcript: &str,
    ) -> Result<ArtifactRef, ApplicationError> {
        *self.transcript.lock().unwrap() = Some(transcript.to_string());
        let name = format!("script_{session}_0.txt");
        Ok(ArtifactRef {
            url: format!("/download/script/{name}"),
            path: name.into(),
        })
    }
}
