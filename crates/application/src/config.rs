//! Tuning knobs for the generation pipeline

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Target number of sentences per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempts per voice candidate
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff unit after a rate-limit error, multiplied by the attempt number
    #[serde(default = "default_rate_limit_base_wait_ms")]
    pub rate_limit_base_wait_ms: u64,

    /// Extra wait once rate-limit errors pile up across the run
    #[serde(default = "default_rate_limit_penalty_ms")]
    pub rate_limit_penalty_ms: u64,

    /// Consecutive rate-limit errors before the penalty applies
    #[serde(default = "default_rate_limit_penalty_threshold")]
    pub rate_limit_penalty_threshold: u32,

    /// Deadline for a single synthesis attempt
    #[serde(default = "default_synthesis_timeout_ms")]
    pub synthesis_timeout_ms: u64,

    /// Deadline for each batch queue pop; exceeding it fails the run
    #[serde(default = "default_queue_timeout_ms")]
    pub queue_timeout_ms: u64,

    /// Loudness every segment is adjusted to
    #[serde(default = "default_target_dbfs")]
    pub target_dbfs: f64,

    /// Fade applied to the tail of the second music bed
    #[serde(default = "default_fade_out_ms")]
    pub fade_out_ms: u64,

    /// Text spoken by Speaker1 right after the intro music
    #[serde(default = "default_welcome_text")]
    pub welcome_text: String,

    /// Lower bound of the requested episode length in minutes
    #[serde(default = "default_target_duration_min")]
    pub target_duration_min: u32,

    /// Upper bound of the requested episode length in minutes
    #[serde(default = "default_target_duration_max")]
    pub target_duration_max: u32,

    /// Shortest sentence text accepted from the script stream
    #[serde(default = "default_min_sentence_chars")]
    pub min_sentence_chars: usize,

    /// Capacity of the bounded batch queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_batch_size() -> usize {
    3
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_rate_limit_base_wait_ms() -> u64 {
    10_000
}

const fn default_rate_limit_penalty_ms() -> u64 {
    30_000
}

const fn default_rate_limit_penalty_threshold() -> u32 {
    3
}

const fn default_synthesis_timeout_ms() -> u64 {
    60_000
}

const fn default_queue_timeout_ms() -> u64 {
    300_000
}

const fn default_target_dbfs() -> f64 {
    -18.0
}

const fn default_fade_out_ms() -> u64 {
    1000
}

fn default_welcome_text() -> String {
    "Welcome to the DuoCast AI podcast".to_string()
}

const fn default_target_duration_min() -> u32 {
    3
}

const fn default_target_duration_max() -> u32 {
    5
}

const fn default_min_sentence_chars() -> usize {
    5
}

const fn default_queue_capacity() -> usize {
    16
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            rate_limit_base_wait_ms: default_rate_limit_base_wait_ms(),
            rate_limit_penalty_ms: default_rate_limit_penalty_ms(),
            rate_limit_penalty_threshold: default_rate_limit_penalty_threshold(),
            synthesis_timeout_ms: default_synthesis_timeout_ms(),
            queue_timeout_ms: default_queue_timeout_ms(),
            target_dbfs: default_target_dbfs(),
            fade_out_ms: default_fade_out_ms(),
            welcome_text: default_welcome_text(),
            target_duration_min: default_target_duration_min(),
            target_duration_max: default_target_duration_max(),
            min_sentence_chars: default_min_sentence_chars(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl PipelineConfig {
    pub const fn queue_timeout(&self) -> Duration {
        Duration::from_millis(self.queue_timeout_ms)
    }

    pub const fn synthesis_timeout(&self) -> Duration {
        Duration::from_millis(self.synthesis_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("pipeline.batch_size must be at least 1".to_string());
        }
        if self.max_retries == 0 {
            return Err("pipeline.max_retries must be at least 1".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("pipeline.queue_capacity must be at least 1".to_string());
        }
        if self.queue_timeout_ms == 0 || self.synthesis_timeout_ms == 0 {
            return Err("pipeline timeouts must be greater than zero".to_string());
        }
        if self.target_duration_min > self.target_duration_max {
            return Err(format!(
                "pipeline.target_duration_min ({}) exceeds target_duration_max ({})",
                self.target_duration_min, self.target_duration_max
            ));
        }
        if !self.target_dbfs.is_finite() || self.target_dbfs > 0.0 {
            return Err("pipeline.target_dbfs must be a finite value <= 0".to_string());
        }
        if self.welcome_text.trim().is_empty() {
            return Err("pipeline.welcome_text must not be empty".to_string());
        }
        Ok(())
    }
}

/// Background music beds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicConfig {
    /// First bed, played before the welcome line and before the outro
    #[serde(default = "default_intro_bed")]
    pub intro_bed: PathBuf,

    /// Second bed, always faded out
    #[serde(default = "default_outro_bed")]
    pub outro_bed: PathBuf,
}

fn default_intro_bed() -> PathBuf {
    PathBuf::from("assets/bgm01.wav")
}

fn default_outro_bed() -> PathBuf {
    PathBuf::from("assets/bgm02.wav")
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            intro_bed: default_intro_bed(),
            outro_bed: default_outro_bed(),
        }
    }
}

/// What the cover summary is built from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverSource {
    /// The raw source material, summarized while the script is written
    #[default]
    Content,
    /// Keywords and title taken from the finished script
    Script,
}

/// Cover art generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverConfig {
    #[serde(default)]
    pub source: CoverSource,

    #[serde(default = "default_style_type")]
    pub style_type: String,

    #[serde(default = "default_style_weight")]
    pub style_weight: f32,

    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,

    #[serde(default = "default_prompt_optimizer")]
    pub prompt_optimizer: bool,

    /// Number of images requested
    #[serde(default = "default_count")]
    pub count: u32,

    /// Image prompt used when the summarizer returns nothing
    #[serde(default = "default_fallback_prompt")]
    pub fallback_prompt: String,

    /// Characters of source content fed to the summarizer
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,
}

fn default_style_type() -> String {
    "漫画".to_string()
}

const fn default_style_weight() -> f32 {
    1.0
}

fn default_aspect_ratio() -> String {
    "1:1".to_string()
}

const fn default_prompt_optimizer() -> bool {
    true
}

const fn default_count() -> u32 {
    1
}

fn default_fallback_prompt() -> String {
    "A man and a woman talking in a podcast studio, comic style".to_string()
}

const fn default_summary_chars() -> usize {
    500
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            source: CoverSource::default(),
            style_type: default_style_type(),
            style_weight: default_style_weight(),
            aspect_ratio: default_aspect_ratio(),
            prompt_optimizer: default_prompt_optimizer(),
            count: default_count(),
            fallback_prompt: default_fallback_prompt(),
            summary_chars: default_summary_chars(),
        }
    }
}

impl CoverConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.count == 0 {
            return Err("cover.count must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.style_weight) {
            return Err(format!(
                "cover.style_weight must be within 0..=1, got {}",
                self.style_weight
            ));
        }
        if self.fallback_prompt.trim().is_empty() {
            return Err("cover.fallback_prompt must not be empty".to_string());
        }
        Ok(())
    }
}
