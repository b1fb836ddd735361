//! Batch summarisation over an ordered list of URLs.
//!
//! At most `workers` pipelines run at the same time. Results come back in input
//! order no matter which finishes first, and one URL failing never affects the
//! others.
//!
//! Cancellation is cooperative: once the token fires no further item starts,
//! items already running finish normally and keep their result, and every item
//! that never started is reported as [`PipelineError::Cancelled`].

use crate::error::PipelineError;
use crate::pipeline::PipelineRunner;
use crate::summary::{SummaryResult, SummaryType};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Notified each time a batch item reaches its final result.
pub trait BatchObserver: Send + Sync {
    fn item_finished(&self, index: usize, result: &SummaryResult, completed: usize, total: usize);
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {
    fn item_finished(&self, _: usize, _: &SummaryResult, _: usize, _: usize) {}
}

/// Split newline separated input into URLs, skipping blank lines.
pub fn parse_url_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct BatchOrchestrator {
    runner: Arc<PipelineRunner>,
    workers: usize,
}

impl BatchOrchestrator {
    pub fn new(runner: Arc<PipelineRunner>, workers: usize) -> Self {
        Self {
            runner,
            workers: workers.max(1),
        }
    }

    /// Summarise every URL; `result[i]` always belongs to `urls[i]`.
    pub async fn run(&self, urls: &[String], summary_type: SummaryType) -> Vec<SummaryResult> {
        self.run_batch(urls, summary_type, &CancellationToken::new(), &NoopObserver)
            .await
    }

    #[instrument(skip_all, fields(total = urls.len(), summary_type = %summary_type))]
    pub async fn run_batch(
        &self,
        urls: &[String],
        summary_type: SummaryType,
        cancel: &CancellationToken,
        observer: &dyn BatchObserver,
    ) -> Vec<SummaryResult> {
        let total = urls.len();
        let semaphore = Semaphore::new(self.workers);
        let completed = AtomicUsize::new(0);

        info!("starting batch of {total} URLs with {} workers", self.workers);

        let items = urls.iter().enumerate().map(|(index, url)| {
            let semaphore = &semaphore;
            let completed = &completed;
            async move {
                // Semaphore is FIFO, so items start in input order
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire() => permit.ok(),
                };

                let result = match permit {
                    Some(_permit) if !cancel.is_cancelled() => {
                        self.runner.run(url, summary_type).await
                    }
                    _ => SummaryResult::failure(url.as_str(), summary_type, PipelineError::Cancelled),
                };

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                observer.item_finished(index, &result, done, total);
                result
            }
        });

        let results = join_all(items).await;

        let failed = results.iter().filter(|result| !result.is_success()).count();
        info!("batch finished: {} succeeded, {failed} failed", total - failed);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_lists() {
        let input = "https://a.test\n\n   https://b.test  \r\n\t\nhttps://a.test\n";
        assert_eq!(
            parse_url_list(input),
            vec!["https://a.test", "https://b.test", "https://a.test"]
        );
        assert!(parse_url_list("  \n \n").is_empty());
    }
}
