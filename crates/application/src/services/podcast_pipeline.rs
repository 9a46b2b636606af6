//! Pipeline controller
//!
//! Drives one generation run through
//! `WelcomeSynthesis → ScriptAndCoverConcurrent → OutroAppend → CoverJoin →
//! FinalMerge → Complete`. The script producer and the cover task run on
//! their own tasks; this controller is the only consumer of the batch queue
//! and the only writer of the progressive audio. Every step is reported on
//! one ordered event stream that ends with either `complete` or `error`.

use std::{fmt, sync::Arc, time::Duration};

use domain::{
    BgmCue, CoverResult, PipelineStage, PodcastEvent, ProgressStep, SessionId, Speaker,
    TraceRegistry,
};
use tokio::{
    sync::mpsc,
    task::{JoinError, JoinHandle},
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    cancellation::CancelToken,
    config::{CoverConfig, CoverSource, MusicConfig, PipelineConfig},
    error::PipelineError,
    ports::{
        ArtifactRef, ArtifactStorePort, AudioCodecPort, ImageGenerationPort, SpeechSynthesisPort,
        TextGenerationPort,
    },
    services::{
        cover_art::{CoverArtTask, CoverMaterial, CoverTimeouts},
        progressive_assembler::{EmissionThrottle, ProgressiveAssembler, SnapshotRef},
        prompts,
        script_producer::{ProducerMessage, ProducerSummary, ScriptProducer},
        synthesis_retry::{RateLimitTracker, RetryPolicy, SentenceSynthesizer},
        voice_binding_resolver::ResolvedVoices,
    },
};

/// Trace key of the welcome line
pub const WELCOME_TRACE_KEY: &str = "welcome_tts";

/// Capacity of the outward event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Collaborators of the pipeline
#[derive(Clone)]
pub struct PipelinePorts {
    pub text: Arc<dyn TextGenerationPort>,
    pub speech: Arc<dyn SpeechSynthesisPort>,
    pub images: Arc<dyn ImageGenerationPort>,
    pub codec: Arc<dyn AudioCodecPort>,
    pub store: Arc<dyn ArtifactStorePort>,
}

impl fmt::Debug for PipelinePorts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelinePorts").finish_non_exhaustive()
    }
}

/// Settings of the pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub pipeline: PipelineConfig,
    pub music: MusicConfig,
    pub cover: CoverConfig,
    pub cover_timeouts: CoverTimeouts,
}

/// One generation request
#[derive(Debug, Clone)]
pub struct PodcastRequest {
    pub session: SessionId,
    pub content: String,
    pub voices: ResolvedVoices,
}

/// Artifacts and totals of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodcastOutcome {
    pub stage: PipelineStage,
    pub final_audio: ArtifactRef,
    pub transcript: ArtifactRef,
    pub cover: CoverResult,
    pub traces: TraceRegistry,
    pub total_sentences: u32,
    pub total_batches: u32,
}

/// Outward event channel; a vanished receiver is not an error
#[derive(Debug, Clone)]
struct EventSink {
    tx: mpsc::Sender<PodcastEvent>,
}

impl EventSink {
    async fn emit(&self, event: PodcastEvent) {
        let kind = event.kind();
        if self.tx.send(event).await.is_err() {
            debug!(kind, "Event receiver dropped");
        }
    }

    async fn trace(&self, registry: &mut TraceRegistry, traces: &TraceRegistry) {
        for (op, trace_id) in traces.iter() {
            if registry.record(op, trace_id) {
                self.emit(PodcastEvent::trace(op, trace_id)).await;
            }
        }
    }
}

/// Aborts the wrapped task unless it was joined
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> AbortOnDrop<T> {
    async fn join(mut self) -> Result<T, JoinError> {
        (&mut self.0).await
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Pipeline controller
pub struct PodcastPipeline {
    ports: PipelinePorts,
    settings: PipelineSettings,
    synthesizer: SentenceSynthesizer,
}

impl fmt::Debug for PodcastPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodcastPipeline")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PodcastPipeline {
    pub fn new(ports: PipelinePorts, settings: PipelineSettings) -> Self {
        let synthesizer = SentenceSynthesizer::new(
            Arc::clone(&ports.speech),
            RetryPolicy::from_config(&settings.pipeline),
            settings.pipeline.synthesis_timeout(),
        );
        Self {
            ports,
            settings,
            synthesizer,
        }
    }

    /// Run on a new task and return the event stream
    pub fn start(
        self: &Arc<Self>,
        request: PodcastRequest,
        cancel: CancelToken,
    ) -> (
        mpsc::Receiver<PodcastEvent>,
        JoinHandle<Result<PodcastOutcome, PipelineError>>,
    ) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let pipeline = Arc::clone(self);
        let handle = tokio::spawn(async move { pipeline.run(request, tx, cancel).await });
        (rx, handle)
    }

    /// Execute one run, reporting progress on `events`
    ///
    /// A fatal error is reported as a final `error` event and returned.
    #[instrument(skip_all, fields(session_id = %request.session))]
    pub async fn run(
        &self,
        request: PodcastRequest,
        events: mpsc::Sender<PodcastEvent>,
        cancel: CancelToken,
    ) -> Result<PodcastOutcome, PipelineError> {
        let mut run = Run {
            pipeline: self,
            request: &request,
            events: EventSink { tx: events },
            cancel: &cancel,
            stage: PipelineStage::WelcomeSynthesis,
            traces: TraceRegistry::new(),
            tracker: RateLimitTracker::new(),
            throttle: EmissionThrottle::new(),
            transcript: Vec::new(),
            synthesized: 0,
            total_batches: 0,
        };

        match run.execute().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(stage = %run.stage, error = %err, "Podcast generation failed");
                run.stage = PipelineStage::Failed;
                run.events.emit(PodcastEvent::error(err.to_string())).await;
                Err(err)
            },
        }
    }
}

/// State of one run, owned by the controller
struct Run<'a> {
    pipeline: &'a PodcastPipeline,
    request: &'a PodcastRequest,
    events: EventSink,
    cancel: &'a CancelToken,
    stage: PipelineStage,
    traces: TraceRegistry,
    tracker: RateLimitTracker,
    throttle: EmissionThrottle,
    transcript: Vec<String>,
    synthesized: u32,
    total_batches: u32,
}

impl Run<'_> {
    fn advance(&mut self, next: PipelineStage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        self.stage = self.stage.transition(next)?;
        info!(stage = %self.stage, "Pipeline stage");
        Ok(())
    }

    fn settings(&self) -> &PipelineSettings {
        &self.pipeline.settings
    }

    fn ports(&self) -> &PipelinePorts {
        &self.pipeline.ports
    }

    async fn emit_snapshot(
        &self,
        snapshot: SnapshotRef,
        batch_number: Option<u32>,
        sentence_count: Option<u32>,
    ) {
        self.events
            .emit(PodcastEvent::ProgressiveAudio {
                audio_ref: snapshot.audio_ref,
                duration_ms: snapshot.duration_ms,
                batch_number,
                sentence_count,
            })
            .await;
    }

    async fn execute(&mut self) -> Result<PodcastOutcome, PipelineError> {
        let mut assembler = ProgressiveAssembler::new(
            Arc::clone(&self.ports().codec),
            Arc::clone(&self.ports().store),
            self.request.session.clone(),
            &self.settings().pipeline,
        );

        self.welcome(&mut assembler).await?;

        self.advance(PipelineStage::ScriptAndCoverConcurrent)?;
        let early_cover = match self.settings().cover.source {
            CoverSource::Content => Some(
                self.spawn_cover(CoverMaterial::Content(self.request.content.clone())),
            ),
            CoverSource::Script => None,
        };
        let summary = self.drain_script(&mut assembler).await?;
        if self.transcript.is_empty() {
            return Err(PipelineError::EmptyScript);
        }
        // script-sourced covers overlap the outro instead of the script
        let cover = match early_cover {
            Some(cover) => cover,
            None => self.spawn_cover(CoverMaterial::Script(self.transcript.clone())),
        };
        self.events
            .emit(PodcastEvent::progress(
                ProgressStep::ScriptComplete,
                format!(
                    "Script complete: {} sentences in {} batches",
                    summary.total_sentences, self.total_batches
                ),
            ))
            .await;

        self.advance(PipelineStage::OutroAppend)?;
        self.outro(&mut assembler).await;

        self.advance(PipelineStage::CoverJoin)?;
        let cover = self.join_cover(cover).await?;

        self.advance(PipelineStage::FinalMerge)?;
        self.events
            .emit(PodcastEvent::progress(
                ProgressStep::AudioMerging,
                "Merging the full episode",
            ))
            .await;
        let final_audio = self
            .cancel
            .run_until_cancelled(assembler.finalize())
            .await?
            .map_err(|e| PipelineError::Storage(e.to_string()))?;
        let transcript = self
            .cancel
            .run_until_cancelled(
                self.ports()
                    .store
                    .write_transcript(&self.request.session, &self.transcript.join("\n")),
            )
            .await?
            .map_err(|e| PipelineError::Storage(e.to_string()))?;

        self.advance(PipelineStage::Complete)?;
        let total_sentences = u32::try_from(self.transcript.len()).unwrap_or(u32::MAX);
        info!(
            total_sentences,
            total_batches = self.total_batches,
            synthesized = self.synthesized,
            duration_ms = assembler.state().duration_ms(),
            "Podcast complete"
        );
        self.events
            .emit(PodcastEvent::Complete {
                final_audio_ref: final_audio.url.clone(),
                script_ref: transcript.url.clone(),
                cover_url: if cover.success {
                    cover.image_url.clone()
                } else {
                    String::new()
                },
                trace_registry: self.traces.clone(),
                total_sentences,
                total_batches: self.total_batches,
            })
            .await;

        Ok(PodcastOutcome {
            stage: self.stage,
            final_audio,
            transcript,
            cover,
            traces: self.traces.clone(),
            total_sentences,
            total_batches: self.total_batches,
        })
    }

    /// Music, welcome line, faded music
    async fn welcome(&mut self, assembler: &mut ProgressiveAssembler) -> Result<(), PipelineError> {
        self.events
            .emit(PodcastEvent::progress(
                ProgressStep::WelcomeAudio,
                "Playing the welcome audio",
            ))
            .await;
        let pipeline = self.pipeline;
        let voices = &self.request.voices;
        for warning in &voices.warnings {
            self.events.emit(PodcastEvent::log(warning.clone())).await;
        }
        self.events.trace(&mut self.traces, &voices.traces).await;
        self.events
            .emit(PodcastEvent::Bgm {
                bgm_type: BgmCue::Bgm01,
            })
            .await;

        if let Err(e) = assembler.load_music(&pipeline.settings.music).await {
            warn!(error = %e, "Music beds unavailable, continuing without music");
            self.events
                .emit(PodcastEvent::log(format!(
                    "Background music unavailable: {e}"
                )))
                .await;
        }

        let outcome = pipeline
            .synthesizer
            .synthesize(
                &pipeline.settings.pipeline.welcome_text,
                voices.binding(Speaker::Speaker1),
                WELCOME_TRACE_KEY,
                &mut self.tracker,
                self.cancel,
            )
            .await?;
        self.events.trace(&mut self.traces, outcome.trace_ids()).await;
        if outcome.is_failed() {
            self.events
                .emit(PodcastEvent::log(
                    "Welcome line synthesis failed, the intro is music only",
                ))
                .await;
        }

        self.events
            .emit(PodcastEvent::Bgm {
                bgm_type: BgmCue::Bgm02Fadeout,
            })
            .await;
        let welcome = (!outcome.is_failed()).then(|| outcome.audio());
        match assembler.build_intro(welcome).await {
            Ok(snapshot) => self.emit_snapshot(snapshot, None, None).await,
            Err(e) => {
                warn!(error = %e, "Intro assembly failed");
                self.events
                    .emit(PodcastEvent::log(format!("Intro audio failed: {e}")))
                    .await;
            },
        }
        Ok(())
    }

    fn spawn_cover(&self, material: CoverMaterial) -> AbortOnDrop<CoverResult> {
        let settings = self.settings();
        let task = Arc::new(CoverArtTask::new(
            Arc::clone(&self.ports().text),
            Arc::clone(&self.ports().images),
            settings.cover.clone(),
            settings.cover_timeouts,
        ));
        AbortOnDrop(task.spawn(material, self.cancel.clone()))
    }

    /// Consume the batch queue until the producer's completion marker
    async fn drain_script(
        &mut self,
        assembler: &mut ProgressiveAssembler,
    ) -> Result<ProducerSummary, PipelineError> {
        let pipeline = self.pipeline;
        let config = &pipeline.settings.pipeline;
        self.events
            .emit(PodcastEvent::progress(
                ProgressStep::ScriptGeneration,
                "Generating the podcast script",
            ))
            .await;

        let prompt = prompts::script_prompt(
            &self.request.content,
            config.target_duration_min,
            config.target_duration_max,
        );
        let producer = ScriptProducer::new(Arc::clone(&pipeline.ports.text), config);
        let (mut queue, handle) = producer.spawn(prompt, config.queue_capacity, self.cancel.clone());
        let producer = AbortOnDrop(handle);
        let queue_timeout = config.queue_timeout();

        let summary = loop {
            let message = self.next_message(&mut queue, queue_timeout).await?;
            match message {
                Some(ProducerMessage::Started { trace_id }) => {
                    if let Some(trace_id) = trace_id {
                        if self.traces.record("script_generation", trace_id.clone()) {
                            self.events
                                .emit(PodcastEvent::trace("script_generation", trace_id))
                                .await;
                        }
                    }
                },
                Some(ProducerMessage::Batch(batch)) => {
                    self.total_batches += 1;
                    self.synthesize_batch(assembler, &batch).await?;
                },
                Some(ProducerMessage::Done(summary)) => break summary,
                None => {
                    let reason = match producer.join().await {
                        Ok(()) => "queue closed without completion marker".to_string(),
                        Err(e) => e.to_string(),
                    };
                    return Err(PipelineError::ProducerCrashed(reason));
                },
            }
        };

        if let Some(err) = &summary.error {
            self.events
                .emit(PodcastEvent::log(format!("Script stream ended early: {err}")))
                .await;
        }
        if producer.join().await.is_err() {
            debug!("Script producer ended abnormally after its completion marker");
        }
        Ok(summary)
    }

    async fn next_message(
        &self,
        queue: &mut mpsc::Receiver<ProducerMessage>,
        timeout: Duration,
    ) -> Result<Option<ProducerMessage>, PipelineError> {
        match self
            .cancel
            .run_until_cancelled(tokio::time::timeout(timeout, queue.recv()))
            .await?
        {
            Ok(message) => Ok(message),
            Err(_) => Err(PipelineError::QueueTimeout(
                u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        }
    }

    /// Synthesize a batch sentence by sentence and append it
    #[instrument(skip_all, fields(batch = batch.batch_number(), size = batch.len()))]
    async fn synthesize_batch(
        &mut self,
        assembler: &mut ProgressiveAssembler,
        batch: &domain::Batch,
    ) -> Result<(), PipelineError> {
        let mut audio = Vec::with_capacity(batch.len());
        let mut notify = false;

        for sentence in batch.sentences() {
            let speaker = sentence.speaker();
            let sequence = sentence.sequence();
            self.transcript.push(sentence.transcript_line());
            self.events
                .emit(PodcastEvent::ScriptChunk {
                    speaker,
                    text: sentence.text().to_string(),
                    sequence,
                    batch_number: batch.batch_number(),
                })
                .await;

            let binding = self.request.voices.binding(speaker);
            let outcome = self
                .pipeline
                .synthesizer
                .synthesize(
                    sentence.text(),
                    binding,
                    &format!("tts_{}_{sequence}", speaker.label()),
                    &mut self.tracker,
                    self.cancel,
                )
                .await?;
            self.events.trace(&mut self.traces, outcome.trace_ids()).await;

            if outcome.is_failed() {
                warn!(%speaker, sequence, "Sentence dropped after all voices failed");
                self.events
                    .emit(PodcastEvent::log(format!(
                        "Sentence {sequence} could not be synthesized and was skipped"
                    )))
                    .await;
                continue;
            }
            if outcome.used_fallback() {
                self.events
                    .emit(PodcastEvent::log(format!(
                        "{speaker} sentence {sequence} fell back to the default voice"
                    )))
                    .await;
            }
            self.synthesized += 1;
            notify |= self.throttle.record(sequence);
            audio.push(outcome.into_audio());
        }

        match assembler.append_batch(&audio).await {
            Ok(Some(snapshot)) if notify => {
                self.emit_snapshot(snapshot, Some(batch.batch_number()), Some(self.synthesized))
                    .await;
            },
            Ok(_) => {},
            Err(e) => {
                warn!(error = %e, "Batch could not be appended");
                self.events
                    .emit(PodcastEvent::log(format!(
                        "Batch {} audio could not be appended: {e}",
                        batch.batch_number()
                    )))
                    .await;
            },
        }
        Ok(())
    }

    async fn outro(&self, assembler: &mut ProgressiveAssembler) {
        self.events
            .emit(PodcastEvent::progress(
                ProgressStep::AddingEndingBgm,
                "Adding the closing music",
            ))
            .await;
        match assembler.append_outro().await {
            Ok(Some(snapshot)) => self.emit_snapshot(snapshot, None, None).await,
            Ok(None) => debug!("No music beds, outro skipped"),
            Err(e) => {
                warn!(error = %e, "Outro append failed");
                self.events
                    .emit(PodcastEvent::log(format!("Closing music failed: {e}")))
                    .await;
            },
        }
    }

    async fn join_cover(
        &mut self,
        cover: AbortOnDrop<CoverResult>,
    ) -> Result<CoverResult, PipelineError> {
        let cover = match self.cancel.run_until_cancelled(cover.join()).await? {
            Ok(result) => result,
            Err(e) => CoverResult::failure(format!("Cover task crashed: {e}"), "", None, None),
        };

        let mut cover_traces = TraceRegistry::new();
        if let Some(id) = &cover.prompt_trace_id {
            cover_traces.record("cover_prompt_generation", id.clone());
        }
        if let Some(id) = &cover.image_trace_id {
            cover_traces.record("cover_image_generation", id.clone());
        }
        self.events.trace(&mut self.traces, &cover_traces).await;

        if cover.success {
            self.events
                .emit(PodcastEvent::CoverImage {
                    image_url: cover.image_url.clone(),
                    prompt: cover.prompt.clone(),
                })
                .await;
            self.events
                .emit(PodcastEvent::progress(
                    ProgressStep::CoverComplete,
                    "Cover image ready",
                ))
                .await;
        } else {
            warn!(message = %cover.message, "Continuing without a cover");
            self.events
                .emit(PodcastEvent::log(format!(
                    "Cover generation failed: {}",
                    cover.message
                )))
                .await;
        }
        Ok(cover)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationSignal;
    use crate::ports::{GeneratedImage, MockImageGenerationPort};
    use crate::services::voice_binding_resolver::ResolvedVoices;
    use crate::testing::{FakeCodec, MemoryStore, ScriptedSpeech, ScriptedText, VoiceScript};
    use crate::ApplicationError;
    use domain::{DefaultVoice, VoiceBinding};

    fn default_voices() -> ResolvedVoices {
        ResolvedVoices {
            speaker1: VoiceBinding::default_voice(
                Speaker::Speaker1,
                DefaultVoice::for_speaker(Speaker::Speaker1),
            ),
            speaker2: VoiceBinding::default_voice(
                Speaker::Speaker2,
                DefaultVoice::for_speaker(Speaker::Speaker2),
            ),
            traces: TraceRegistry::new(),
            warnings: Vec::new(),
        }
    }

    fn images_ok() -> MockImageGenerationPort {
        let mut images = MockImageGenerationPort::new();
        images.expect_generate_image().returning(|_| {
            Ok(GeneratedImage {
                url: "https://img.example/cover.png".to_string(),
                trace_id: Some("img-trace".to_string()),
            })
        });
        images
    }

    struct Harness {
        pipeline: PodcastPipeline,
        speech: Arc<ScriptedSpeech>,
        store: Arc<MemoryStore>,
    }

    fn harness(text: ScriptedText, speech: ScriptedSpeech, images: MockImageGenerationPort, store: MemoryStore) -> Harness {
        harness_with(PipelineSettings::default(), text, speech, images, store)
    }

    fn harness_with(
        settings: PipelineSettings,
        text: ScriptedText,
        speech: ScriptedSpeech,
        images: MockImageGenerationPort,
        store: MemoryStore,
    ) -> Harness {
        let speech = Arc::new(speech);
        let store = Arc::new(store);
        let ports = PipelinePorts {
            text: Arc::new(text),
            speech: Arc::clone(&speech) as Arc<dyn SpeechSynthesisPort>,
            images: Arc::new(images),
            codec: Arc::new(FakeCodec),
            store: Arc::clone(&store) as Arc<dyn ArtifactStorePort>,
        };
        Harness {
            pipeline: PodcastPipeline::new(ports, settings),
            speech,
            store,
        }
    }

    fn request() -> PodcastRequest {
        PodcastRequest {
            session: SessionId::parse("sess42").unwrap(),
            content: "An article about podcasts".to_string(),
            voices: default_voices(),
        }
    }

    async fn run(
        harness: &Harness,
        cancel: CancelToken,
    ) -> (Result<PodcastOutcome, PipelineError>, Vec<PodcastEvent>) {
        let (tx, mut rx) = mpsc::channel(1024);
        let result = harness.pipeline.run(request(), tx, cancel).await;
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (result, events)
    }

    fn count(events: &[PodcastEvent], kind: &str) -> usize {
        events.iter().filter(|e| e.kind() == kind).count()
    }

    #[tokio::test(start_paused = true)]
    async fn script_sourced_cover_uses_finished_transcript() {
        let text = ScriptedText::lines(&[
            "Speaker1: Glaciers carve valleys.",
            "Speaker2: Meltwater feeds rivers.",
        ]);
        let settings = PipelineSettings {
            cover: CoverConfig {
                source: CoverSource::Script,
                ..CoverConfig::default()
            },
            ..PipelineSettings::default()
        };
        let h = harness_with(settings, text.clone(), ScriptedSpeech::new(), images_ok(), MemoryStore::new());

        let (result, _events) = run(&h, CancelToken::never()).await;
        let outcome = result.unwrap();

        assert_eq!(outcome.stage, PipelineStage::Complete);
        assert!(outcome.cover.success);
        let prompts = text.reply_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Podcast topic: Glaciers"));
        assert!(prompts[0].contains("Keywords: Glaciers, carve, valleys, Meltwater, feeds"));
        assert!(!prompts[0].contains("An article about podcasts"));
    }

    #[tokio::test(start_paused = true)]
    async fn content_sourced_cover_uses_request_content() {
        let text = ScriptedText::lines(&["Speaker1: Hello there."]);
        let h = harness(text.clone(), ScriptedSpeech::new(), images_ok(), MemoryStore::new());

        let (result, _events) = run(&h, CancelToken::never()).await;
        result.unwrap();

        let prompts = text.reply_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("An article about podcasts"));
    }

    #[tokio::test(start_paused = true)]
    async fn two_line_script_produces_one_batch_and_transcript() {
        let h = harness(
            ScriptedText::lines(&["Speaker1: Welcome to the show.", "Speaker2: Thanks for having me."]),
            ScriptedSpeech::new(),
            images_ok(),
            MemoryStore::new(),
        );

        let (result, events) = run(&h, CancelToken::never()).await;
        let outcome = result.unwrap();

        assert_eq!(outcome.stage, PipelineStage::Complete);
        assert_eq!(outcome.total_batches, 1);
        assert_eq!(outcome.total_sentences, 2);
        // welcome line plus two sentences
        assert_eq!(h.speech.calls().len(), 3);
        assert_eq!(
            h.store.transcript().unwrap(),
            "Speaker1: Welcome to the show.\nSpeaker2: Thanks for having me."
        );
        assert!(outcome.traces.get(WELCOME_TRACE_KEY).is_some());
        assert!(outcome.traces.get("tts_Speaker2_2").is_some());
        assert_eq!(outcome.traces.get("script_generation"), Some("script-trace"));

        match events.last() {
            Some(PodcastEvent::Complete {
                cover_url,
                total_sentences,
                total_batches,
                ..
            }) => {
                assert_eq!(cover_url, "https://img.example/cover.png");
                assert_eq!(*total_sentences, 2);
                assert_eq!(*total_batches, 1);
            },
            other => panic!("expected complete event, got {other:?}"),
        }
        assert_eq!(count(&events, "error"), 0);
        assert_eq!(count(&events, "script_chunk"), 2);
        assert_eq!(count(&events, "cover_image"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_ordered_and_durations_grow() {
        let h = harness(
            ScriptedText::lines(&[
                "Speaker1: first sentence here",
                "Speaker2: second sentence here",
                "Speaker1: third sentence here",
                "Speaker2: fourth sentence here",
            ]),
            ScriptedSpeech::new(),
            images_ok(),
            MemoryStore::new(),
        );

        let (result, events) = run(&h, CancelToken::never()).await;
        result.unwrap();

        assert!(matches!(
            events.first(),
            Some(PodcastEvent::Progress {
                step: ProgressStep::WelcomeAudio,
                ..
            })
        ));
        let sequences: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                PodcastEvent::ScriptChunk { sequence, .. } => Some(*sequence),
                _ => None,
            })
            .collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);

        let durations: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                PodcastEvent::ProgressiveAudio { duration_ms, .. } => Some(*duration_ms),
                _ => None,
            })
            .collect();
        assert!(durations.len() >= 3);
        assert!(durations.windows(2).all(|w| w[0] <= w[1]));
        // intro, outro and every batch update are snapshotted
        assert_eq!(h.store.snapshots().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_script_fails_without_complete() {
        let h = harness(
            ScriptedText::lines(&["no speaker here", "Narrator: hello everyone"]),
            ScriptedSpeech::new(),
            images_ok(),
            MemoryStore::new(),
        );

        let (result, events) = run(&h, CancelToken::never()).await;

        assert!(matches!(result, Err(PipelineError::EmptyScript)));
        assert_eq!(count(&events, "complete"), 0);
        assert!(matches!(events.last(), Some(PodcastEvent::Error { .. })));
        assert!(h.store.final_audio().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cover_failure_still_completes_with_empty_url() {
        let mut images = MockImageGenerationPort::new();
        images
            .expect_generate_image()
            .returning(|_| Err(ApplicationError::Inference("content policy".to_string())));
        let h = harness(
            ScriptedText::lines(&["Speaker1: Welcome to the show."]),
            ScriptedSpeech::new(),
            images,
            MemoryStore::new(),
        );

        let (result, events) = run(&h, CancelToken::never()).await;
        let outcome = result.unwrap();

        assert!(!outcome.cover.success);
        match events.last() {
            Some(PodcastEvent::Complete { cover_url, .. }) => assert_eq!(cover_url, ""),
            other => panic!("expected complete event, got {other:?}"),
        }
        assert_eq!(count(&events, "cover_image"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sentence_does_not_abort_the_run() {
        let speaker2 = DefaultVoice::for_speaker(Speaker::Speaker2).voice_id;
        let h = harness(
            ScriptedText::lines(&["Speaker1: Welcome to the show.", "Speaker2: Thanks for having me."]),
            ScriptedSpeech::new().with_voice(speaker2, vec![VoiceScript::Fails]),
            images_ok(),
            MemoryStore::new(),
        );

        let (result, events) = run(&h, CancelToken::never()).await;
        let outcome = result.unwrap();

        assert_eq!(outcome.total_sentences, 2);
        assert!(events.iter().any(|e| matches!(
            e,
            PodcastEvent::Log { message } if message.contains("Sentence 2 could not be synthesized")
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_producer_times_out() {
        let h = harness(
            ScriptedText::lines(&["Speaker1: Welcome to the show."]).then_hang(),
            ScriptedSpeech::new(),
            images_ok(),
            MemoryStore::new(),
        );

        let (result, events) = run(&h, CancelToken::never()).await;

        assert!(matches!(result, Err(PipelineError::QueueTimeout(300_000))));
        assert_eq!(count(&events, "complete"), 0);
        assert!(matches!(events.last(), Some(PodcastEvent::Error { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn final_write_failure_is_fatal() {
        let h = harness(
            ScriptedText::lines(&["Speaker1: Welcome to the show."]),
            ScriptedSpeech::new(),
            images_ok(),
            MemoryStore::failing_final(),
        );

        let (result, events) = run(&h, CancelToken::never()).await;

        assert!(matches!(result, Err(PipelineError::Storage(_))));
        assert_eq!(count(&events, "complete"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_run() {
        let h = Arc::new(harness(
            ScriptedText::lines(&["Speaker1: Welcome to the show."]).then_hang(),
            ScriptedSpeech::new(),
            images_ok(),
            MemoryStore::new(),
        ));
        let signal = CancellationSignal::new();
        let token = signal.token();
        let runner = Arc::clone(&h);
        let task = tokio::spawn(async move { run(&runner, token).await });

        tokio::time::sleep(Duration::from_secs(5)).await;
        signal.cancel();
        let (result, events) = task.await.unwrap();

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert_eq!(count(&events, "complete"), 0);
        assert!(matches!(events.last(), Some(PodcastEvent::Error { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn start_streams_events_from_a_task() {
        let h = harness(
            ScriptedText::lines(&["Speaker1: Welcome to the show."]),
            ScriptedSpeech::new(),
            images_ok(),
            MemoryStore::new(),
        );
        let pipeline = Arc::new(h.pipeline);

        let (mut rx, handle) = pipeline.start(request(), CancelToken::never());
        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }

        assert!(handle.await.unwrap().is_ok());
        assert!(matches!(last, Some(PodcastEvent::Complete { .. })));
    }
}
