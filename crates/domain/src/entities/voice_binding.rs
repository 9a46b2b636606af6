//! Default voices and per-speaker voice bindings

use serde::{Deserialize, Serialize};

use crate::{errors::DomainError, value_objects::Speaker};

/// Voice gender as listed in the default table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

/// Entry of the built-in default voice table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultVoice {
    pub key: &'static str,
    pub name: &'static str,
    pub gender: Gender,
    pub voice_id: &'static str,
    pub description: &'static str,
    pub speaker: Speaker,
}

/// Built-in voices, one per speaker
pub const DEFAULT_VOICES: [DefaultVoice; 2] = [
    DefaultVoice {
        key: "mini",
        name: "Mini",
        gender: Gender::Female,
        voice_id: "moss_audio_aaa1346a-7ce7-11f0-8e61-2e6e3c7ee85d",
        description: "Female host voice",
        speaker: Speaker::Speaker1,
    },
    DefaultVoice {
        key: "max",
        name: "Max",
        gender: Gender::Male,
        voice_id: "moss_audio_ce44fc67-7ce3-11f0-8de5-96e35d26fb85",
        description: "Male host voice",
        speaker: Speaker::Speaker2,
    },
];

impl DefaultVoice {
    /// Look up a default voice by key, case-insensitively
    pub fn lookup(name: &str) -> Result<Self, DomainError> {
        let key = name.trim().to_lowercase();
        DEFAULT_VOICES
            .iter()
            .find(|v| v.key == key)
            .copied()
            .ok_or_else(|| DomainError::UnknownDefaultVoice(name.to_string()))
    }

    /// The default voice that belongs to a speaker
    pub fn for_speaker(speaker: Speaker) -> Self {
        match speaker {
            Speaker::Speaker1 => DEFAULT_VOICES[0],
            Speaker::Speaker2 => DEFAULT_VOICES[1],
        }
    }
}

/// One synthesis attempt target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceCandidate {
    pub voice_id: String,
    pub is_fallback: bool,
}

/// Resolved voice for one speaker, read-only once synthesis starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceBinding {
    speaker: Speaker,
    primary_voice_id: String,
    is_custom: bool,
    fallback_voice_id: String,
}

impl VoiceBinding {
    /// Binding to a default voice; its fallback is the speaker's own default
    pub fn default_voice(speaker: Speaker, voice: DefaultVoice) -> Self {
        Self {
            speaker,
            primary_voice_id: voice.voice_id.to_string(),
            is_custom: false,
            fallback_voice_id: DefaultVoice::for_speaker(speaker).voice_id.to_string(),
        }
    }

    /// Binding to a custom or cloned voice with the speaker's default as fallback
    pub fn custom(speaker: Speaker, voice_id: impl Into<String>) -> Self {
        Self {
            speaker,
            primary_voice_id: voice_id.into(),
            is_custom: true,
            fallback_voice_id: DefaultVoice::for_speaker(speaker).voice_id.to_string(),
        }
    }

    pub const fn speaker(&self) -> Speaker {
        self.speaker
    }

    pub fn primary_voice_id(&self) -> &str {
        &self.primary_voice_id
    }

    pub const fn is_custom(&self) -> bool {
        self.is_custom
    }

    pub fn fallback_voice_id(&self) -> &str {
        &self.fallback_voice_id
    }

    /// Ordered synthesis candidates
    ///
    /// Custom bindings try the custom voice and then the speaker default.
    /// Non-custom bindings have a single candidate.
    pub fn candidates(&self) -> Vec<VoiceCandidate> {
        let mut out = vec![VoiceCandidate {
            voice_id: self.primary_voice_id.clone(),
            is_fallback: false,
        }];
        if self.is_custom && self.fallback_voice_id != self.primary_voice_id {
            out.push(VoiceCandidate {
                voice_id: self.fallback_voice_id.clone(),
                is_fallback: true,
            });
        }
        out
    }
}
