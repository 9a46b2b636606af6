//! Synthesis voice identifier with format rules

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const MIN_LEN: usize = 8;
const MAX_LEN: usize = 256;
const GENERATED_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Result of checking a candidate voice id against the format rules
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoiceIdCheck {
    /// Human-readable rule violations, empty when the id is valid
    pub errors: Vec<String>,
}

impl VoiceIdCheck {
    /// Whether all rules passed
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A format-valid voice identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoiceId(String);

impl VoiceId {
    /// Check a raw id against every rule and collect all violations
    pub fn check(raw: &str) -> VoiceIdCheck {
        let mut errors = Vec::new();
        let len = raw.chars().count();

        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            errors.push(format!(
                "length must be between {MIN_LEN} and {MAX_LEN} characters (got {len})"
            ));
        }

        if raw
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            errors.push("only letters, digits, '-' and '_' are allowed".to_string());
        }

        match raw.chars().next() {
            Some(first) if first.is_ascii_alphabetic() => {},
            _ => errors.push("must start with a letter".to_string()),
        }

        if raw.ends_with('-') || raw.ends_with('_') {
            errors.push("must not end with '-' or '_'".to_string());
        }

        VoiceIdCheck { errors }
    }

    /// Parse a raw id, failing with every rule it breaks
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let check = Self::check(raw);
        if check.is_valid() {
            Ok(Self(raw.to_string()))
        } else {
            Err(DomainError::invalid_voice_id(raw, &check.errors))
        }
    }

    /// Generate a fresh id for a cloned voice
    ///
    /// Shape: `{prefix}_{8 lowercase letters or digits}_{6 digits}`.
    pub fn generate(prefix: &str) -> Result<Self, DomainError> {
        let mut rng = rand::rng();
        let tag: String = (0..8)
            .map(|_| char::from(GENERATED_CHARSET[rng.random_range(0..GENERATED_CHARSET.len())]))
            .collect();
        let serial: u32 = rng.random_range(100_000..=999_999);
        Self::parse(&format!("{prefix}_{tag}_{serial}"))
    }

    /// Borrow the raw string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VoiceId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VoiceId> for String {
    fn from(id: VoiceId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_voice_ids() {
        assert!(VoiceId::parse("moss_audio_aaa1346a-7ce7-11f0-8e61-2e6e3c7ee85d").is_ok());
        assert!(VoiceId::parse("customVoice_ab12cd34_123456").is_ok());
    }

    #[test]
    fn rejects_short_id() {
        let check = VoiceId::check("abc");
        assert_eq!(check.errors.len(), 1);
        assert!(check.errors[0].contains("length"));
    }

    #[test]
    fn rejects_leading_digit() {
        let check = VoiceId::check("1voice_abc");
        assert!(!check.is_valid());
        assert!(check.errors.iter().any(|e| e.contains("start with a letter")));
    }

    #[test]
    fn rejects_trailing_separator() {
        assert!(!VoiceId::check("voice_abc_").is_valid());
        assert!(!VoiceId::check("voice-abc-").is_valid());
    }

    #[test]
    fn rejects_disallowed_characters() {
        let check = VoiceId::check("voice abc!");
        assert!(check.errors.iter().any(|e| e.contains("only letters")));
    }

    #[test]
    fn collects_every_violation() {
        let check = VoiceId::check("_");
        assert_eq!(check.errors.len(), 3);
    }

    #[test]
    fn empty_id_is_invalid() {
        let err = VoiceId::parse("").unwrap_err();
        assert!(matches!(err, DomainError::InvalidVoiceId { .. }));
    }

    #[test]
    fn generated_ids_follow_shape() {
        let id = VoiceId::generate("customVoice").unwrap();
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "customVoice");
        assert_eq!(parts[1].len(), 8);
        assert!(
            parts[1]
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
        let serial: u32 = parts[2].parse().unwrap();
        assert!((100_000..=999_999).contains(&serial));
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<VoiceId, _> = serde_json::from_str("\"voice_abcdef\"");
        assert!(ok.is_ok());
        let bad: Result<VoiceId, _> = serde_json::from_str("\"x\"");
        assert!(bad.is_err());
    }
}
