//! Page retrieval over HTTP(S).
//!
//! The pipeline talks to a [`Fetcher`] trait object so tests can count or fake
//! network calls. [`ReqwestFetcher`] is the production implementation and owns
//! a single configured `reqwest::Client`.

use crate::error::{FetchError, FetchErrorKind, ValidationError};
use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Browser-like User-Agent; some sites refuse obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117.0.0.0 Safari/537.36";

/// Bytes of response body read before the rest is dropped
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Connection settings for the page fetcher.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    pub redirect_limit: usize,
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            redirect_limit: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Raw page as returned by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after following redirects, used to resolve relative links
    pub final_url: Url,
    pub html: String,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Parse and normalise a user supplied URL.
///
/// Only `http` and `https` are accepted. The `url` crate already lowercases
/// the scheme and host; the fragment is dropped since it never reaches the
/// server.
pub fn validate_url(raw: &str) -> Result<Url, ValidationError> {
    let trimmed = raw.trim();
    let mut url =
        Url::parse(trimmed).map_err(|e| ValidationError::InvalidUrl(format!("{trimmed}: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(ValidationError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::InvalidUrl(format!("{trimmed}: missing host")));
    }

    url.set_fragment(None);
    Ok(url)
}

/// Fetcher backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl ReqwestFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .redirect(redirect::Policy::limited(settings.redirect_limit))
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: settings.max_body_bytes,
        })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    #[instrument(skip_all, fields(url = %url), level = "debug")]
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FetchErrorKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let final_url = response.url().clone();
        if let Some(length) = response.content_length() {
            if length > self.max_body_bytes as u64 {
                debug!("{final_url} announces {length} bytes, keeping the first {}", self.max_body_bytes);
            }
        }

        // oversized bodies are cut at max_body_bytes
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(map_reqwest_error)? {
            let room = self.max_body_bytes - body.len();
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                break;
            }
            body.extend_from_slice(&chunk);
        }
        let html = String::from_utf8_lossy(&body).into_owned();
        debug!("fetched {} bytes from {}", body.len(), final_url);

        Ok(FetchedPage { final_url, html })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FetchErrorKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FetchErrorKind::TooManyRedirects, err.to_string());
    }
    FetchError::new(FetchErrorKind::Unreachable, err.to_string())
}
