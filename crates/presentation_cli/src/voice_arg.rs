//! `--speaker1` / `--speaker2` argument parsing

use std::{path::PathBuf, str::FromStr};

use anyhow::Context;
use application::SpeakerVoiceConfig;

/// Voice choice as typed on the command line
///
/// `default:<name>`, `voice-id:<id>` or `clone:<path to audio sample>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceArg {
    Default(String),
    VoiceId(String),
    Clone(PathBuf),
}

impl FromStr for VoiceArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <kind>:<value>, got '{s}'"))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(format!("missing value after '{kind}:'"));
        }
        match kind.trim() {
            "default" => Ok(Self::Default(value.to_string())),
            "voice-id" => Ok(Self::VoiceId(value.to_string())),
            "clone" => Ok(Self::Clone(PathBuf::from(value))),
            other => Err(format!(
                "unknown voice kind '{other}' (use default, voice-id or clone)"
            )),
        }
    }
}

impl VoiceArg {
    /// Turn the argument into resolver input, reading clone samples from disk
    pub async fn into_config(self) -> anyhow::Result<SpeakerVoiceConfig> {
        Ok(match self {
            Self::Default(name) => SpeakerVoiceConfig::Default(name),
            Self::VoiceId(id) => SpeakerVoiceConfig::VoiceId(id),
            Self::Clone(path) => {
                let sample = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("failed to read voice sample {}", path.display()))?;
                let file_name = path
                    .file_name()
                    .map_or_else(|| "sample.wav".to_string(), |n| n.to_string_lossy().into_owned());
                SpeakerVoiceConfig::Clone { sample, file_name }
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_kind() {
        assert_eq!(
            "default:mini".parse::<VoiceArg>().unwrap(),
            VoiceArg::Default("mini".to_string())
        );
        assert_eq!(
            "voice-id:male-qn-qingse".parse::<VoiceArg>().unwrap(),
            VoiceArg::VoiceId("male-qn-qingse".to_string())
        );
        assert_eq!(
            "clone:/tmp/me.wav".parse::<VoiceArg>().unwrap(),
            VoiceArg::Clone(PathBuf::from("/tmp/me.wav"))
        );
    }

    #[test]
    fn keeps_colons_in_the_value() {
        assert_eq!(
            "clone:C:/samples/me.wav".parse::<VoiceArg>().unwrap(),
            VoiceArg::Clone(PathBuf::from("C:/samples/me.wav"))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("mini".parse::<VoiceArg>().is_err());
        assert!("default:".parse::<VoiceArg>().is_err());
        assert!("robot:xyz".parse::<VoiceArg>().unwrap_err().contains("robot"));
    }

    #[tokio::test]
    async fn clone_reads_the_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.wav");
        tokio::fs::write(&path, b"RIFF").await.unwrap();

        let config = VoiceArg::Clone(path).into_config().await.unwrap();
        assert_eq!(
            config,
            SpeakerVoiceConfig::Clone {
                sample: b"RIFF".to_vec(),
                file_name: "voice.wav".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn missing_sample_is_an_error() {
        let err = VoiceArg::Clone(PathBuf::from("/nonexistent/voice.wav"))
            .into_config()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("voice.wav"));
    }
}
