//! Records of the ordered event stream a generation run produces

use serde::{Deserialize, Serialize};

use crate::{entities::TraceRegistry, value_objects::Speaker};

/// Named progress milestones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStep {
    WelcomeAudio,
    ScriptGeneration,
    ScriptComplete,
    AddingEndingBgm,
    AudioMerging,
    CoverComplete,
}

/// Music bed announcements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BgmCue {
    #[serde(rename = "bgm01")]
    Bgm01,
    #[serde(rename = "bgm02_fadeout")]
    Bgm02Fadeout,
}

/// One record of the run's output stream
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"trace_id","api":"script_generation","traceId":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PodcastEvent {
    Progress {
        step: ProgressStep,
        message: String,
    },
    Bgm {
        bgm_type: BgmCue,
    },
    ProgressiveAudio {
        audio_ref: String,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        batch_number: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sentence_count: Option<u32>,
    },
    ScriptChunk {
        speaker: Speaker,
        text: String,
        sequence: u32,
        batch_number: u32,
    },
    TraceId {
        api: String,
        trace_id: String,
    },
    CoverImage {
        image_url: String,
        prompt: String,
    },
    /// Non-fatal informational message
    Log {
        message: String,
    },
    /// Terminal failure; no `complete` follows
    Error {
        message: String,
    },
    Complete {
        final_audio_ref: String,
        script_ref: String,
        cover_url: String,
        trace_registry: TraceRegistry,
        total_sentences: u32,
        total_batches: u32,
    },
}

impl PodcastEvent {
    pub fn progress(step: ProgressStep, message: impl Into<String>) -> Self {
        Self::Progress {
            step,
            message: message.into(),
        }
    }

    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn trace(api: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::TraceId {
            api: api.into(),
            trace_id: trace_id.into(),
        }
    }

    /// Whether this record ends the stream
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }

    /// Tag value as it appears on the wire
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Bgm { .. } => "bgm",
            Self::ProgressiveAudio { .. } => "progressive_audio",
            Self::ScriptChunk { .. } => "script_chunk",
            Self::TraceId { .. } => "trace_id",
            Self::CoverImage { .. } => "cover_image",
            Self::Log { .. } => "log",
            Self::Error { .. } => "error",
            Self::Complete { .. } => "complete",
        }
    }
}
