//! Sentence synthesis with rate-limit backoff and voice fallback
//!
//! Each sentence walks a small state machine: an [`Attempt`] names the
//! voice candidate and the retry index, its [`AttemptResult`] feeds
//! [`RetryPolicy::step`], and the returned [`RetryStep`] says whether to
//! stop, try again, back off, or give up. The rate-limit counter lives in a
//! [`RateLimitTracker`] owned by the caller so it spans the whole run.

use std::{sync::Arc, time::Duration};

use domain::{SynthesisOutcome, TraceRegistry, VoiceBinding, VoiceCandidate};
use futures::StreamExt;
use tracing::{debug, instrument, warn};

use crate::{
    cancellation::CancelToken,
    config::PipelineConfig,
    error::ApplicationError,
    ports::{SpeechEvent, SpeechSynthesisPort, SynthesisStream},
};

/// Substrings that mark an error message as a rate-limit rejection
pub const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "rpm",
    "too many requests",
    "限流",
];

/// Classification of one finished attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    Success,
    RateLimited,
    OtherFailure,
}

/// Classify a failed attempt
///
/// Typed rate-limit errors are recognized directly. Everything else falls
/// back to a case-insensitive marker search over the message.
pub fn classify_failure(error: &ApplicationError) -> AttemptResult {
    if matches!(error, ApplicationError::RateLimited(_)) {
        return AttemptResult::RateLimited;
    }
    let message = error.to_string().to_lowercase();
    if RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
    {
        AttemptResult::RateLimited
    } else {
        AttemptResult::OtherFailure
    }
}

/// Position in the candidate/retry grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// Index into the binding's candidate list
    pub candidate: usize,
    /// Zero-based retry index for this candidate
    pub retry: u32,
}

impl Attempt {
    pub const FIRST: Self = Self {
        candidate: 0,
        retry: 0,
    };
}

/// What to do after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStep {
    /// The attempt produced audio
    Done,
    /// Run `Attempt` immediately
    Proceed(Attempt),
    /// Sleep, then run `then` or give up when it is `None`
    Backoff {
        wait: Duration,
        then: Option<Attempt>,
    },
    /// Every candidate is spent
    Exhausted,
}

/// Consecutive rate-limit errors across a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitTracker {
    consecutive: u32,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one rate-limit error and return the new streak
    pub fn record(&mut self) -> u32 {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub const fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

/// Retry and backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_wait: Duration,
    pub penalty: Duration,
    pub penalty_threshold: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            base_wait: Duration::from_millis(config.rate_limit_base_wait_ms),
            penalty: Duration::from_millis(config.rate_limit_penalty_ms),
            penalty_threshold: config.rate_limit_penalty_threshold,
        }
    }

    /// Backoff after the `retry`-th attempt with a streak of `consecutive`
    pub fn backoff(&self, retry: u32, consecutive: u32) -> Duration {
        let wait = self.base_wait.saturating_mul(retry.saturating_add(1));
        if consecutive >= self.penalty_threshold {
            wait.saturating_add(self.penalty)
        } else {
            wait
        }
    }

    /// Advance the state machine
    pub fn step(
        &self,
        attempt: Attempt,
        result: AttemptResult,
        candidate_count: usize,
        tracker: &mut RateLimitTracker,
    ) -> RetryStep {
        let next_candidate = (attempt.candidate + 1 < candidate_count).then_some(Attempt {
            candidate: attempt.candidate + 1,
            retry: 0,
        });
        match result {
            AttemptResult::Success => {
                tracker.reset();
                RetryStep::Done
            },
            AttemptResult::RateLimited => {
                let consecutive = tracker.record();
                let then = if attempt.retry + 1 < self.max_retries {
                    Some(Attempt {
                        candidate: attempt.candidate,
                        retry: attempt.retry + 1,
                    })
                } else {
                    next_candidate
                };
                RetryStep::Backoff {
                    wait: self.backoff(attempt.retry, consecutive),
                    then,
                }
            },
            AttemptResult::OtherFailure => {
                next_candidate.map_or(RetryStep::Exhausted, RetryStep::Proceed)
            },
        }
    }
}

/// What one attempt yielded
#[derive(Debug)]
struct AttemptRun {
    audio: Vec<u8>,
    trace_id: Option<String>,
    completed: bool,
    error: Option<ApplicationError>,
}

impl AttemptRun {
    fn failed(trace_id: Option<String>, completed: bool, error: ApplicationError) -> Self {
        Self {
            audio: Vec::new(),
            trace_id,
            completed,
            error: Some(error),
        }
    }

    fn result(&self) -> AttemptResult {
        self.error
            .as_ref()
            .map_or(AttemptResult::Success, classify_failure)
    }
}

/// Synthesizes single sentences against a voice binding
pub struct SentenceSynthesizer {
    speech: Arc<dyn SpeechSynthesisPort>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl std::fmt::Debug for SentenceSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentenceSynthesizer")
            .field("policy", &self.policy)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish_non_exhaustive()
    }
}

impl SentenceSynthesizer {
    pub fn new(
        speech: Arc<dyn SpeechSynthesisPort>,
        policy: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            speech,
            policy,
            attempt_timeout,
        }
    }

    /// Synthesize `text`, falling back through the binding's candidates
    ///
    /// A sentence that fails on every candidate yields a failed outcome,
    /// not an error. The only error is [`ApplicationError::Cancelled`].
    /// Trace ids are keyed `trace_key`, with `_fallback` appended for the
    /// fallback voice.
    #[instrument(skip(self, text, binding, tracker, cancel), fields(speaker = %binding.speaker()))]
    pub async fn synthesize(
        &self,
        text: &str,
        binding: &VoiceBinding,
        trace_key: &str,
        tracker: &mut RateLimitTracker,
        cancel: &CancelToken,
    ) -> Result<SynthesisOutcome, ApplicationError> {
        let candidates = binding.candidates();
        let mut traces = TraceRegistry::new();
        let mut attempt = Attempt::FIRST;

        while let Some(candidate) = candidates.get(attempt.candidate) {
            let run = self.run_attempt(text, candidate, cancel).await?;
            if run.completed {
                if let Some(trace_id) = &run.trace_id {
                    traces.record(candidate_trace_key(trace_key, candidate), trace_id.clone());
                }
            }

            let result = run.result();
            match self
                .policy
                .step(attempt, result, candidates.len(), tracker)
            {
                RetryStep::Done => {
                    debug!(
                        voice_id = %candidate.voice_id,
                        bytes = run.audio.len(),
                        fallback = candidate.is_fallback,
                        "Sentence synthesized"
                    );
                    return Ok(SynthesisOutcome::succeeded(
                        run.audio,
                        candidate.is_fallback,
                        traces,
                    ));
                },
                RetryStep::Proceed(next) => {
                    warn!(
                        voice_id = %candidate.voice_id,
                        attempt = attempt.retry + 1,
                        error = ?run.error,
                        "Voice failed, moving to next candidate"
                    );
                    attempt = next;
                },
                RetryStep::Backoff { wait, then } => {
                    warn!(
                        voice_id = %candidate.voice_id,
                        attempt = attempt.retry + 1,
                        consecutive = tracker.consecutive(),
                        wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                        "Rate limited, backing off"
                    );
                    cancel.sleep(wait).await?;
                    match then {
                        Some(next) => attempt = next,
                        None => break,
                    }
                },
                RetryStep::Exhausted => {
                    warn!(
                        voice_id = %candidate.voice_id,
                        error = ?run.error,
                        "Voice failed, no candidates left"
                    );
                    break;
                },
            }
        }

        warn!(trace_key, "All voice candidates failed, dropping sentence");
        Ok(SynthesisOutcome::failed(traces))
    }

    #[instrument(skip(self, text, candidate, cancel), fields(voice_id = %candidate.voice_id))]
    async fn run_attempt(
        &self,
        text: &str,
        candidate: &VoiceCandidate,
        cancel: &CancelToken,
    ) -> Result<AttemptRun, ApplicationError> {
        let bounded = tokio::time::timeout(
            self.attempt_timeout,
            self.stream_audio(text, &candidate.voice_id),
        );
        match cancel.run_until_cancelled(bounded).await? {
            Ok(run) => Ok(run),
            Err(_) => Ok(AttemptRun::failed(
                None,
                false,
                ApplicationError::Timeout(
                    u64::try_from(self.attempt_timeout.as_millis()).unwrap_or(u64::MAX),
                ),
            )),
        }
    }

    async fn stream_audio(&self, text: &str, voice_id: &str) -> AttemptRun {
        let SynthesisStream {
            trace_id,
            mut events,
        } = match self.speech.synthesize_stream(text, voice_id).await {
            Ok(stream) => stream,
            Err(e) => return AttemptRun::failed(None, false, e),
        };

        let mut audio = Vec::new();
        while let Some(event) = events.next().await {
            match event {
                Ok(SpeechEvent::Audio(bytes)) => audio.extend_from_slice(&bytes),
                Ok(SpeechEvent::Complete) if audio.is_empty() => {
                    return AttemptRun::failed(
                        trace_id,
                        true,
                        ApplicationError::Speech("no audio received before completion".to_string()),
                    );
                },
                Ok(SpeechEvent::Complete) => {
                    return AttemptRun {
                        audio,
                        trace_id,
                        completed: true,
                        error: None,
                    };
                },
                Err(e) => return AttemptRun::failed(trace_id, false, e),
            }
        }
        AttemptRun::failed(
            trace_id,
            false,
            ApplicationError::Speech("synthesis stream ended without completion".to_string()),
        )
    }
}

fn candidate_trace_key(base: &str, candidate: &VoiceCandidate) -> String {
    if candidate.is_fallback {
        format!("{base}_fallback")
    } else {
        base.to_string()
    }
}
