//! Types for speech processing
//!
//! Contains audio formats, synthesis stream items, cloning requests and
//! voice catalog entries.

use std::{fmt, pin::Pin};

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

/// Audio formats the synthesis and conversion layers deal with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MP3 format
    #[default]
    Mp3,
    /// WAV format (uncompressed)
    Wav,
    /// FLAC format (lossless)
    Flac,
    /// Raw PCM
    Pcm,
}

impl AudioFormat {
    /// Get the MIME type for this audio format
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Wav => "audio/wav",
            Self::Flac => "audio/flac",
            Self::Pcm => "audio/L16",
        }
    }

    /// Get the file extension for this audio format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Pcm => "pcm",
        }
    }

    /// Guess the format from a file name
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = name.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "mp3" => Some(Self::Mp3),
            "wav" | "wave" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "pcm" => Some(Self::Pcm),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One item of a synthesis stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechChunk {
    /// Decoded audio bytes in the configured output format
    Audio(Vec<u8>),
    /// The service finished the utterance
    Complete,
}

/// Boxed stream of synthesis items
pub type SpeechChunkStream = Pin<Box<dyn Stream<Item = Result<SpeechChunk, SpeechError>> + Send>>;

/// A started synthesis call
pub struct SpeechStream {
    /// Trace id from the response headers
    pub trace_id: Option<String>,
    pub chunks: SpeechChunkStream,
}

impl fmt::Debug for SpeechStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechStream")
            .field("trace_id", &self.trace_id)
            .finish_non_exhaustive()
    }
}

/// Input for voice cloning
#[derive(Clone)]
pub struct CloneRequest {
    /// Raw bytes of the audio sample
    pub audio: Vec<u8>,
    /// File name sent with the upload
    pub file_name: String,
    /// Identifier the new voice should get
    pub voice_id: String,
    /// Preview text the service reads with the cloned voice
    pub sample_text: String,
}

impl fmt::Debug for CloneRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloneRequest")
            .field("audio_len", &self.audio.len())
            .field("file_name", &self.file_name)
            .field("voice_id", &self.voice_id)
            .finish_non_exhaustive()
    }
}

/// Successful clone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneResult {
    pub voice_id: String,
    pub upload_trace_id: Option<String>,
    pub clone_trace_id: Option<String>,
}

/// Where a voice in the catalog comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceKind {
    System,
    Cloned,
    Generated,
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub voice_id: String,
    pub name: Option<String>,
    pub kind: VoiceKind,
}
