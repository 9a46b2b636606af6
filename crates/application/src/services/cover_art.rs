//! Cover art task
//!
//! Two sequential calls: the text model condenses the source material, or a
//! digest of the finished script, into a short image prompt, then the image
//! model renders it. Failures end up in
//! the returned [`CoverResult`] and never abort the run.

use std::{future::Future, sync::Arc, time::Duration};

use domain::CoverResult;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::{
    cancellation::CancelToken,
    config::CoverConfig,
    error::ApplicationError,
    ports::{ImageGenerationPort, ImageRequest, TextGenerationPort},
    services::prompts,
};

/// Per-stage deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverTimeouts {
    pub prompt: Duration,
    pub image: Duration,
}

impl Default for CoverTimeouts {
    fn default() -> Self {
        Self {
            prompt: Duration::from_secs(30),
            image: Duration::from_secs(60),
        }
    }
}

/// Input the cover is drawn from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverMaterial {
    /// Raw source content
    Content(String),
    /// Transcript lines of the finished script
    Script(Vec<String>),
}

impl CoverMaterial {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Content(_) => "content",
            Self::Script(_) => "script",
        }
    }

    /// Text handed to the prompt summarizer
    pub fn summary(&self, max_content_chars: usize) -> String {
        match self {
            Self::Content(content) => prompts::summarize(content, max_content_chars).to_string(),
            Self::Script(lines) => prompts::ScriptDigest::from_lines(lines).brief(),
        }
    }
}

/// Cover art generator
pub struct CoverArtTask {
    text: Arc<dyn TextGenerationPort>,
    images: Arc<dyn ImageGenerationPort>,
    config: CoverConfig,
    timeouts: CoverTimeouts,
}

impl std::fmt::Debug for CoverArtTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverArtTask")
            .field("config", &self.config)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

async fn bounded<T>(
    limit: Duration,
    cancel: &CancelToken,
    fut: impl Future<Output = Result<T, ApplicationError>>,
) -> Result<T, ApplicationError> {
    let limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
    cancel
        .run_until_cancelled(tokio::time::timeout(limit, fut))
        .await?
        .map_err(|_| ApplicationError::Timeout(limit_ms))?
}

impl CoverArtTask {
    pub fn new(
        text: Arc<dyn TextGenerationPort>,
        images: Arc<dyn ImageGenerationPort>,
        config: CoverConfig,
        timeouts: CoverTimeouts,
    ) -> Self {
        Self {
            text,
            images,
            config,
            timeouts,
        }
    }

    /// Run on its own task; the handle is the write-once result slot
    pub fn spawn(
        self: Arc<Self>,
        material: CoverMaterial,
        cancel: CancelToken,
    ) -> JoinHandle<CoverResult> {
        tokio::spawn(async move { self.generate(&material, &cancel).await })
    }

    /// Generate the cover for `material`
    #[instrument(skip_all, fields(source = material.kind()))]
    pub async fn generate(&self, material: &CoverMaterial, cancel: &CancelToken) -> CoverResult {
        let summary = material.summary(self.config.summary_chars);
        let reply = match bounded(
            self.timeouts.prompt,
            cancel,
            self.text.generate(&prompts::cover_prompt(&summary)),
        )
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Cover prompt generation failed");
                return CoverResult::failure(
                    format!("Cover prompt generation failed: {e}"),
                    "",
                    None,
                    None,
                );
            },
        };

        let prompt = match reply.content.trim() {
            "" => self.config.fallback_prompt.clone(),
            text => text.to_string(),
        };
        let request = ImageRequest {
            prompt: prompt.clone(),
            style_type: self.config.style_type.clone(),
            style_weight: self.config.style_weight,
            aspect_ratio: self.config.aspect_ratio.clone(),
            prompt_optimizer: self.config.prompt_optimizer,
            count: self.config.count,
        };

        match bounded(self.timeouts.image, cancel, self.images.generate_image(request)).await {
            Ok(image) => {
                info!(url = %image.url, "Cover image generated");
                CoverResult::success(image.url, prompt, reply.trace_id, image.trace_id)
            },
            Err(e) => {
                warn!(error = %e, "Cover image generation failed");
                CoverResult::failure(
                    format!("Cover image generation failed: {e}"),
                    prompt,
                    reply.trace_id,
                    None,
                )
            },
        }
    }
}
