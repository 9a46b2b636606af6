//! DuoCast CLI
//!
//! Generates two-speaker podcasts and inspects the voices of the configured
//! MiniMax account.

#![allow(clippy::print_stdout)]

mod generate;
mod voice_arg;

use std::path::PathBuf;

use anyhow::{Context, bail};
use application::VoiceCatalogPort;
use clap::{Parser, Subcommand};
use domain::VoiceId;
use infrastructure::{AppConfig, SpeechAdapter, init_telemetry};

use crate::{generate::GenerateOptions, voice_arg::VoiceArg};

/// DuoCast CLI
#[derive(Debug, Parser)]
#[command(name = "duocast")]
#[command(author, version, about = "Two-speaker podcast generator", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (defaults to ./duocast.toml when present)
    #[arg(short, long, env = "DUOCAST_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a podcast from a text file
    ///
    /// Events are printed to stdout as JSON lines; logs go to stderr.
    /// Example: duocast generate --content-file article.txt --speaker2 clone:me.wav
    Generate {
        /// Source material for the script
        #[arg(long)]
        content_file: PathBuf,

        /// Voice of the first speaker: default:<name>, voice-id:<id> or clone:<wav>
        #[arg(long, default_value = "default:mini")]
        speaker1: VoiceArg,

        /// Voice of the second speaker
        #[arg(long, default_value = "default:max")]
        speaker2: VoiceArg,

        /// Session identifier used in artifact names (random when omitted)
        #[arg(long)]
        session_id: Option<String>,

        /// Replace unavailable voice ids with the suggested defaults
        #[arg(long)]
        accept_default_voices: bool,
    },

    /// List the voice ids available to the account
    Voices,

    /// Check a voice id against the format rules
    CheckVoiceId {
        /// Candidate voice id
        voice_id: String,
    },
}

/// Log filter for a `-v` count, `None` keeps the configured filter
const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("duocast=debug,application=debug,infrastructure=debug,ai_core=info,ai_speech=info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(filter) = log_filter_from_verbosity(cli.verbose) {
        config.telemetry.log_filter = filter.to_string();
    }
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

async fn list_voices(config: &AppConfig) -> anyhow::Result<()> {
    if !config.speech.has_credentials() {
        bail!("no MiniMax API key configured (set DUOCAST_MINIMAX__API_KEY)");
    }
    let speech = SpeechAdapter::new(config.speech.clone())?;
    let listing = speech.list_voices().await?;
    for voice_id in &listing.voice_ids {
        println!("{voice_id}");
    }
    Ok(())
}

/// Report the format check as JSON; an invalid id is an error
fn check_voice_id(voice_id: &str) -> anyhow::Result<String> {
    let check = VoiceId::check(voice_id);
    let valid = check.is_valid();
    let report = serde_json::json!({
        "voice_id": voice_id,
        "valid": valid,
        "errors": check.errors,
    });
    if valid {
        Ok(report.to_string())
    } else {
        bail!("{report}")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::CheckVoiceId { voice_id } = &cli.command {
        println!("{}", check_voice_id(voice_id)?);
        return Ok(());
    }

    let config = load_config(&cli)?;
    init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Generate {
            content_file,
            speaker1,
            speaker2,
            session_id,
            accept_default_voices,
        } => {
            let options = GenerateOptions {
                content_file,
                speaker1,
                speaker2,
                session_id,
                accept_default_voices,
            };
            generate::run(&config, options).await?;
        },
        Commands::Voices => list_voices(&config).await?,
        Commands::CheckVoiceId { .. } => {},
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn generate_uses_default_voices() {
        let cli = parse(&["duocast", "generate", "--content-file", "a.txt"]).unwrap();
        match cli.command {
            Commands::Generate {
                content_file,
                speaker1,
                speaker2,
                session_id,
                accept_default_voices,
            } => {
                assert_eq!(content_file, PathBuf::from("a.txt"));
                assert_eq!(speaker1, VoiceArg::Default("mini".to_string()));
                assert_eq!(speaker2, VoiceArg::Default("max".to_string()));
                assert!(session_id.is_none());
                assert!(!accept_default_voices);
            },
            other => panic!("expected generate, got {other:?}"),
        }
    }

    #[test]
    fn generate_parses_voice_kinds() {
        let cli = parse(&[
            "duocast",
            "generate",
            "--content-file",
            "a.txt",
            "--speaker1",
            "voice-id:male-qn-qingse",
            "--speaker2",
            "clone:me.wav",
            "--session-id",
            "abc123",
            "--accept-default-voices",
        ])
        .unwrap();
        let Commands::Generate {
            speaker1,
            speaker2,
            session_id,
            accept_default_voices,
            ..
        } = cli.command
        else {
            panic!("expected generate");
        };
        assert_eq!(speaker1, VoiceArg::VoiceId("male-qn-qingse".to_string()));
        assert_eq!(speaker2, VoiceArg::Clone(PathBuf::from("me.wav")));
        assert_eq!(session_id.as_deref(), Some("abc123"));
        assert!(accept_default_voices);
    }

    #[test]
    fn generate_requires_content_file() {
        assert!(parse(&["duocast", "generate"]).is_err());
    }

    #[test]
    fn bad_voice_argument_is_rejected() {
        let err = parse(&[
            "duocast",
            "generate",
            "--content-file",
            "a.txt",
            "--speaker1",
            "robot:x",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("robot"));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = parse(&["duocast", "voices", "-vv", "--config", "custom.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Voices));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn check_voice_id_takes_positional() {
        let cli = parse(&["duocast", "check-voice-id", "customVoice_abc12345"]).unwrap();
        assert!(
            matches!(cli.command, Commands::CheckVoiceId { voice_id } if voice_id == "customVoice_abc12345")
        );
    }

    #[test]
    fn verbosity_levels() {
        assert_eq!(log_filter_from_verbosity(0), None);
        assert!(log_filter_from_verbosity(1).unwrap().contains("duocast=debug"));
        assert_eq!(log_filter_from_verbosity(2), Some("debug"));
        assert_eq!(log_filter_from_verbosity(9), Some("trace"));
    }

    #[test]
    fn valid_voice_id_report() {
        let report: serde_json::Value =
            serde_json::from_str(&check_voice_id("male-qn-qingse").unwrap()).unwrap();
        assert_eq!(report["valid"], true);
        assert_eq!(report["errors"], serde_json::json!([]));
    }

    #[test]
    fn invalid_voice_id_is_an_error() {
        let err = check_voice_id("1x").unwrap_err();
        assert!(err.to_string().contains("\"valid\":false"));
    }
}
