//! The inbound operations: summarise one URL, summarise a batch, and read or
//! export the history both of them feed.

use crate::agent::{AgentError, GeminiClient, Summarizer};
use crate::batch::{BatchObserver, BatchOrchestrator};
use crate::config::Config;
use crate::fetcher::{Fetcher, ReqwestFetcher};
use crate::history::HistoryStore;
use crate::pipeline::{PipelineRunner, PipelineSettings};
use crate::summary::{SummaryResult, SummaryType};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("failed to set up page fetcher: {0}")]
    FetcherSetup(#[from] reqwest::Error),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub pipeline: PipelineSettings,
    pub workers: usize,
    /// Record failed results in history as well as successful ones
    pub record_failures: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            pipeline: PipelineSettings::default(),
            workers: 4,
            record_failures: false,
        }
    }
}

impl From<&Config> for AppSettings {
    fn from(config: &Config) -> Self {
        Self {
            pipeline: config.pipeline_settings(),
            workers: config.batch.workers,
            record_failures: config.history.record_failures,
        }
    }
}

pub struct SummaryApp {
    runner: Arc<PipelineRunner>,
    batch: BatchOrchestrator,
    history: Arc<HistoryStore>,
    record_failures: bool,
}

/// Records each finished batch item, then hands it to the caller's observer.
struct HistoryRecorder<'a> {
    app: &'a SummaryApp,
    inner: &'a dyn BatchObserver,
}

impl BatchObserver for HistoryRecorder<'_> {
    fn item_finished(&self, index: usize, result: &SummaryResult, completed: usize, total: usize) {
        self.app.record(result);
        self.inner.item_finished(index, result, completed, total);
    }
}

impl SummaryApp {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        summarizer: Arc<dyn Summarizer>,
        settings: AppSettings,
    ) -> Self {
        let runner = Arc::new(PipelineRunner::new(fetcher, summarizer, settings.pipeline));
        Self {
            batch: BatchOrchestrator::new(runner.clone(), settings.workers),
            runner,
            history: Arc::new(HistoryStore::new()),
            record_failures: settings.record_failures,
        }
    }

    /// Wire up the production fetcher and Gemini client from configuration
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let fetcher = ReqwestFetcher::new(&config.fetch_settings())?;
        let summarizer = GeminiClient::new(config.gemini_settings())?;
        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(summarizer),
            AppSettings::from(config),
        ))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Shared handle for callers that outlive `self`
    pub fn history_handle(&self) -> Arc<HistoryStore> {
        self.history.clone()
    }

    fn record(&self, result: &SummaryResult) -> Option<usize> {
        (result.is_success() || self.record_failures).then(|| self.history.append(result.clone()))
    }

    pub async fn summarize(&self, url: &str, summary_type: SummaryType) -> SummaryResult {
        let result = self.runner.run(url, summary_type).await;
        self.record(&result);
        result
    }

    /// Summarise `urls` in order, recording each item as soon as it finishes.
    pub async fn summarize_batch(
        &self,
        urls: &[String],
        summary_type: SummaryType,
        cancel: &CancellationToken,
        observer: &dyn BatchObserver,
    ) -> Vec<SummaryResult> {
        let recorder = HistoryRecorder {
            app: self,
            inner: observer,
        };
        self.batch
            .run_batch(urls, summary_type, cancel, &recorder)
            .await
    }
}
