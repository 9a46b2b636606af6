//! Audio format converter
//!
//! Decodes compressed audio into mono 16-bit PCM and encodes PCM back into
//! the delivery format. Uses FFmpeg over stdin/stdout pipes, so FFmpeg must
//! be installed on the system.

use std::process::Stdio;

use tokio::{io::AsyncWriteExt, process::Command};
use tracing::{debug, instrument};

use crate::{error::SpeechError, types::AudioFormat};

/// Audio converter backed by FFmpeg
#[derive(Debug, Clone, Default)]
pub struct AudioConverter {
    /// FFmpeg binary path (defaults to "ffmpeg" in PATH)
    ffmpeg_path: Option<String>,
}

impl AudioConverter {
    /// Create a new audio converter with default settings
    #[must_use]
    pub const fn new() -> Self {
        Self { ffmpeg_path: None }
    }

    /// Create a new audio converter with a custom FFmpeg path
    #[must_use]
    pub fn with_ffmpeg_path(path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: Some(path.into()),
        }
    }

    /// Get the FFmpeg binary path
    fn ffmpeg_path(&self) -> &str {
        self.ffmpeg_path.as_deref().unwrap_or("ffmpeg")
    }

    /// Check if FFmpeg is available on the system
    #[instrument(skip(self))]
    pub async fn is_available(&self) -> bool {
        Command::new(self.ffmpeg_path())
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success())
    }

    /// Decode any FFmpeg-readable audio into mono PCM at `sample_rate`
    #[instrument(skip(self, audio), fields(input_len = audio.len()))]
    pub async fn decode_to_pcm(
        &self,
        audio: &[u8],
        sample_rate: u32,
    ) -> Result<Vec<i16>, SpeechError> {
        if audio.is_empty() {
            return Err(SpeechError::InvalidAudio("empty input".to_string()));
        }
        let output = self.run(decode_args(sample_rate), audio.to_vec()).await?;
        Ok(pcm_from_le_bytes(&output))
    }

    /// Encode mono PCM into `format`
    #[instrument(skip(self, samples), fields(samples = samples.len()))]
    pub async fn encode_pcm(
        &self,
        samples: &[i16],
        sample_rate: u32,
        format: AudioFormat,
        bitrate: u32,
    ) -> Result<Vec<u8>, SpeechError> {
        if format == AudioFormat::Pcm {
            return Ok(pcm_to_le_bytes(samples));
        }
        let output = self
            .run(
                encode_args(sample_rate, format, bitrate),
                pcm_to_le_bytes(samples),
            )
            .await?;
        if output.is_empty() {
            return Err(SpeechError::AudioProcessing(
                "FFmpeg produced empty output".to_string(),
            ));
        }
        Ok(output)
    }

    /// Run FFmpeg with `input` on stdin and return stdout
    ///
    /// Stdin is fed from a separate task so a full stdout pipe cannot stall
    /// the write.
    async fn run(&self, args: Vec<String>, input: Vec<u8>) -> Result<Vec<u8>, SpeechError> {
        let mut child = Command::new(self.ffmpeg_path())
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::AudioProcessing(format!("Failed to spawn FFmpeg: {e}")))?;

        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                let result = stdin.write_all(&input).await;
                drop(stdin);
                result
            })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SpeechError::AudioProcessing(format!("Failed to wait for FFmpeg: {e}")))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {},
                Ok(Err(e)) if output.status.success() => {
                    return Err(SpeechError::AudioProcessing(format!(
                        "Failed to write to FFmpeg stdin: {e}"
                    )));
                },
                Ok(Err(_)) => {},
                Err(e) => {
                    return Err(SpeechError::AudioProcessing(format!(
                        "FFmpeg writer task failed: {e}"
                    )));
                },
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::AudioProcessing(format!(
                "FFmpeg conversion failed: {}",
                stderr.trim()
            )));
        }

        debug!(output_len = output.stdout.len(), "FFmpeg finished");
        Ok(output.stdout)
    }
}

fn decode_args(sample_rate: u32) -> Vec<String> {
    [
        "-hide_banner",
        "-loglevel",
        "error",
        "-i",
        "pipe:0",
        "-f",
        "s16le",
        "-acodec",
        "pcm_s16le",
        "-ac",
        "1",
        "-ar",
    ]
    .iter()
    .map(ToString::to_string)
    .chain([sample_rate.to_string(), "pipe:1".to_string()])
    .collect()
}

fn encode_args(sample_rate: u32, format: AudioFormat, bitrate: u32) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "s16le",
        "-ac",
        "1",
        "-ar",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    args.push(sample_rate.to_string());
    args.extend(["-i", "pipe:0"].map(String::from));

    match format {
        AudioFormat::Mp3 => {
            args.extend(["-codec:a", "libmp3lame", "-b:a"].map(String::from));
            args.push(format!("{}k", bitrate / 1000));
            args.extend(["-f", "mp3"].map(String::from));
        },
        AudioFormat::Wav => args.extend(["-codec:a", "pcm_s16le", "-f", "wav"].map(String::from)),
        AudioFormat::Flac => args.extend(["-codec:a", "flac", "-f", "flac"].map(String::from)),
        AudioFormat::Pcm => args.extend(["-f", "s16le"].map(String::from)),
    }
    args.push("pipe:1".to_string());
    args
}

/// Interpret little-endian bytes as i16 samples; a trailing odd byte is dropped
pub fn pcm_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Serialize i16 samples as little-endian bytes
pub fn pcm_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ffmpeg_path() {
        assert_eq!(AudioConverter::new().ffmpeg_path(), "ffmpeg");
        assert_eq!(
            AudioConverter::with_ffmpeg_path("/opt/ffmpeg").ffmpeg_path(),
            "/opt/ffmpeg"
        );
    }

    #[test]
    fn decode_args_request_mono_s16le() {
        let args = decode_args(32_000);
        let joined = args.join(" ");
        assert!(joined.contains("-i pipe:0"));
        assert!(joined.contains("-f s16le"));
        assert!(joined.contains("-ac 1"));
        assert!(joined.ends_with("-ar 32000 pipe:1"));
    }

    #[test]
    fn encode_args_for_mp3() {
        let joined = encode_args(32_000, AudioFormat::Mp3, 128_000).join(" ");
        assert!(joined.contains("-f s16le -ac 1 -ar 32000 -i pipe:0"));
        assert!(joined.contains("libmp3lame -b:a 128k -f mp3"));
        assert!(joined.ends_with("pipe:1"));
    }

    #[test]
    fn encode_args_for_wav() {
        let joined = encode_args(16_000, AudioFormat::Wav, 0).join(" ");
        assert!(joined.contains("-codec:a pcm_s16le -f wav pipe:1"));
    }

    #[test]
    fn pcm_bytes_roundtrip() {
        let samples = vec![0, 1, -1, i16::MAX, i16::MIN];
        assert_eq!(pcm_from_le_bytes(&pcm_to_le_bytes(&samples)), samples);
    }

    #[test]
    fn odd_trailing_byte_is_dropped() {
        assert_eq!(pcm_from_le_bytes(&[1, 0, 7]), vec![1]);
    }

    #[tokio::test]
    async fn pcm_encode_skips_ffmpeg() {
        let converter = AudioConverter::with_ffmpeg_path("/nonexistent/ffmpeg");
        let bytes = converter
            .encode_pcm(&[1, 2], 8000, AudioFormat::Pcm, 0)
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 0, 2, 0]);
    }

    #[tokio::test]
    async fn missing_binary_reports_spawn_failure() {
        let converter = AudioConverter::with_ffmpeg_path("/nonexistent/ffmpeg");
        assert!(!converter.is_available().await);
        let err = converter.decode_to_pcm(&[1, 2, 3], 8000).await.unwrap_err();
        assert!(err.to_string().contains("Failed to spawn FFmpeg"));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let err = AudioConverter::new().decode_to_pcm(&[], 8000).await.unwrap_err();
        assert!(matches!(err, SpeechError::InvalidAudio(_)));
    }

    #[tokio::test]
    async fn encode_then_decode_with_ffmpeg() {
        let converter = AudioConverter::new();
        if !converter.is_available().await {
            return;
        }
        let samples: Vec<i16> = (0..8000).map(|i| ((i % 100) * 100) as i16).collect();
        let wav = converter
            .encode_pcm(&samples, 8000, AudioFormat::Wav, 0)
            .await
            .unwrap();
        let decoded = converter.decode_to_pcm(&wav, 8000).await.unwrap();
        assert_eq!(decoded.len(), samples.len());
    }
}
