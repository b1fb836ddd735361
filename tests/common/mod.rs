#![allow(dead_code)]

use async_trait::async_trait;
use pagebrief::agent::Summarizer;
use pagebrief::error::{FetchError, FetchErrorKind, SummarizationError};
use pagebrief::fetcher::{FetchedPage, Fetcher};
use pagebrief::prompt::SummaryPrompt;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

pub const ARTICLE: &str = r#"<html>
<head>
  <title>Rust 2030 Released</title>
  <link rel="icon" href="/static/favicon.png">
</head>
<body>
  <nav>Home | Blog | About</nav>
  <h1>Rust 2030 Released</h1>
  <p>The Rust team is happy to announce a new edition of the language.</p>
  <img src="/img/pixel.gif" width="50">
  <img src="/img/hero.jpg" width="150">
  <img src="/img/badge.png" width="80">
  <img src="/img/diagram.png" width="200">
  <img src="/img/footer.png" width="300">
  <script>track();</script>
</body>
</html>"#;

pub const EMPTY_PAGE: &str = "<html><head><title>Loading</title></head><body><script>render()</script></body></html>";

/// Fetcher double serving canned pages and counting calls.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, Result<String, FetchError>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(url: &str) -> String {
        Url::parse(url).expect("test URL").to_string()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(Self::key(url), Ok(html.to_string()));
        self
    }

    pub fn with_error(mut self, url: &str, kind: FetchErrorKind) -> Self {
        self.pages
            .insert(Self::key(url), Err(FetchError::new(kind, "scripted failure")));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(url.as_str()) {
            Some(Ok(html)) => Ok(FetchedPage {
                final_url: url.clone(),
                html: html.clone(),
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(FetchError::new(FetchErrorKind::Unreachable, "no such host")),
        }
    }
}

/// Summariser double replaying scripted responses, then a fixed summary.
#[derive(Default)]
pub struct FakeSummarizer {
    script: Mutex<VecDeque<Result<String, SummarizationError>>>,
    prompts: Mutex<Vec<SummaryPrompt>>,
    calls: AtomicUsize,
}

impl FakeSummarizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(responses: Vec<Result<String, SummarizationError>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<SummaryPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, prompt: &SummaryPrompt) -> Result<String, SummarizationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("A concise summary.".to_string()))
    }
}

/// Exactly one of summary text and error must be set.
pub fn assert_one_outcome(result: &pagebrief::SummaryResult) {
    assert!(
        result.summary_text().is_some() ^ result.error().is_some(),
        "result for {} has both or neither outcome",
        result.url()
    );
}
