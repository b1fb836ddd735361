//! Single-URL summarisation pipeline.
//!
//! A run moves through the stages `Fetching -> Extracting -> BuildingPrompt ->
//! Summarizing -> Assembling -> Done`, or jumps to `Failed` as soon as a stage
//! reports a typed error. The outcome is always a [`SummaryResult`], never an
//! `Err`, so callers can put it straight into a batch row.

use crate::agent::Summarizer;
use crate::assets::{select_images, DEFAULT_MAX_IMAGES, DEFAULT_MIN_IMAGE_WIDTH};
use crate::error::{ContentError, FetchError, PipelineError, SummarizationError};
use crate::extractor::{Extractor, DEFAULT_MAX_TEXT_CHARS};
use crate::fetcher::Fetcher;
use crate::prompt::{PromptBuilder, SummaryPrompt, DEFAULT_MAX_PROMPT_CHARS};
use crate::summary::{SummaryRequest, SummaryResult, SummaryType};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Extracting,
    BuildingPrompt,
    Summarizing,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::BuildingPrompt => "building prompt",
            Stage::Summarizing => "summarizing",
            Stage::Assembling => "assembling",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Caller-level retry for transient summarisation failures.
///
/// `Auth` and `EmptyResponse` are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Exponential backoff: `base_delay * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_text_chars: usize,
    pub max_prompt_chars: usize,
    pub max_images: usize,
    pub min_image_width: u32,
    pub retry: RetryPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            max_images: DEFAULT_MAX_IMAGES,
            min_image_width: DEFAULT_MIN_IMAGE_WIDTH,
            retry: RetryPolicy::default(),
        }
    }
}

/// Error plus whatever was learned about the page before it happened
struct Failure {
    error: PipelineError,
    title: Option<String>,
}

impl From<FetchError> for Failure {
    fn from(error: FetchError) -> Self {
        Self {
            error: error.into(),
            title: None,
        }
    }
}

/// Runs the fetch → extract → prompt → summarise chain for one URL.
pub struct PipelineRunner {
    fetcher: Arc<dyn Fetcher>,
    summarizer: Arc<dyn Summarizer>,
    extractor: Extractor,
    prompts: PromptBuilder,
    max_images: usize,
    min_image_width: u32,
    retry: RetryPolicy,
}

impl PipelineRunner {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        summarizer: Arc<dyn Summarizer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            fetcher,
            summarizer,
            extractor: Extractor::new(settings.max_text_chars),
            prompts: PromptBuilder::new(settings.max_prompt_chars),
            max_images: settings.max_images,
            min_image_width: settings.min_image_width,
            retry: settings.retry,
        }
    }

    /// Summarise one URL. Validation happens before any network call.
    #[instrument(skip(self))]
    pub async fn run(&self, url: &str, summary_type: SummaryType) -> SummaryResult {
        let request = match SummaryRequest::new(url, summary_type) {
            Ok(request) => request,
            Err(e) => {
                warn!("rejected {url:?}: {e}");
                return SummaryResult::failure(url, summary_type, e.into());
            }
        };

        info!("summarising {}", request.url);
        match self.run_request(url, &request).await {
            Ok(result) => {
                debug!(stage = %Stage::Done, "pipeline finished");
                result
            }
            Err(failure) => {
                warn!(stage = %Stage::Failed, kind = %failure.error.kind_label(), "{}", failure.error);
                let result = SummaryResult::failure(url, summary_type, failure.error);
                match failure.title {
                    Some(title) => result.with_title(title),
                    None => result,
                }
            }
        }
    }

    async fn run_request(
        &self,
        requested_url: &str,
        request: &SummaryRequest,
    ) -> Result<SummaryResult, Failure> {
        debug!(stage = %Stage::Fetching);
        let fetched = self.fetcher.fetch(&request.url).await?;

        debug!(stage = %Stage::Extracting);
        let page = self.extractor.extract(&fetched.html, &fetched.final_url);
        if page.text.is_empty() {
            return Err(Failure {
                error: ContentError::no_extractable_text().into(),
                title: Some(page.title),
            });
        }

        debug!(stage = %Stage::BuildingPrompt);
        let prompt = self.prompts.build(&page, request.summary_type);

        debug!(stage = %Stage::Summarizing);
        let summary_text = self
            .summarize_with_retry(&prompt)
            .await
            .map_err(|error| Failure {
                error: error.into(),
                title: Some(page.title.clone()),
            })?;

        debug!(stage = %Stage::Assembling);
        let images = select_images(&page.images, self.min_image_width, self.max_images);
        Ok(
            SummaryResult::success(requested_url, request.summary_type, summary_text)
                .with_title(page.title)
                .with_images(images)
                .with_favicon(page.favicon),
        )
    }

    async fn summarize_with_retry(&self, prompt: &SummaryPrompt) -> Result<String, SummarizationError> {
        let mut attempt = 0;
        loop {
            match self.summarizer.summarize(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.kind.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!("summarisation attempt {} failed ({}), retrying in {:?}", attempt + 1, e.kind, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(RetryPolicy::none().delay_for(5), Duration::ZERO);
    }
}
