//! Error taxonomy for the summarisation pipeline.
//!
//! Every stage failure ends up as a [`PipelineError`] attached to the
//! `SummaryResult` of the URL it belongs to. Nothing here is ever allowed to
//! abort a batch.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Input rejected before any I/O takes place.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("unsupported URL scheme '{0}', only http and https are allowed")]
    UnsupportedScheme(String),
    #[error("unknown summary type '{0}', expected short, detailed or bullet")]
    UnknownSummaryType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum FetchErrorKind {
    Timeout,
    HttpStatus(u16),
    Unreachable,
    TooManyRedirects,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "timed out"),
            FetchErrorKind::HttpStatus(code) => write!(f, "HTTP status {code}"),
            FetchErrorKind::Unreachable => write!(f, "host unreachable"),
            FetchErrorKind::TooManyRedirects => write!(f, "too many redirects"),
        }
    }
}

/// Failure while retrieving the page.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("failed to fetch page ({kind}): {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentErrorKind {
    NoExtractableText,
}

/// The page was fetched but offers nothing to summarise.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("no content could be extracted from the page")]
pub struct ContentError {
    pub kind: ContentErrorKind,
}

impl ContentError {
    pub fn no_extractable_text() -> Self {
        Self {
            kind: ContentErrorKind::NoExtractableText,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarizationErrorKind {
    Auth,
    RateLimited,
    Timeout,
    ServiceError,
    EmptyResponse,
}

impl SummarizationErrorKind {
    /// Kinds worth retrying at the caller level.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            SummarizationErrorKind::RateLimited
                | SummarizationErrorKind::Timeout
                | SummarizationErrorKind::ServiceError
        )
    }
}

impl fmt::Display for SummarizationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SummarizationErrorKind::Auth => "authentication failed",
            SummarizationErrorKind::RateLimited => "rate limited",
            SummarizationErrorKind::Timeout => "timed out",
            SummarizationErrorKind::ServiceError => "service error",
            SummarizationErrorKind::EmptyResponse => "empty response",
        };
        f.write_str(label)
    }
}

/// Failure reported by the summarisation service.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("failed to generate summary ({kind}): {message}")]
pub struct SummarizationError {
    pub kind: SummarizationErrorKind,
    pub message: String,
}

impl SummarizationError {
    pub fn new(kind: SummarizationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Typed failure attached to a failed `SummaryResult`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "error", rename_all = "snake_case")]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Summarization(#[from] SummarizationError),
    /// The batch was cancelled before this item started.
    #[error("cancelled before processing started")]
    Cancelled,
}

impl PipelineError {
    /// Short machine-readable label, e.g. `fetch.timeout`.
    pub fn kind_label(&self) -> String {
        match self {
            PipelineError::Validation(err) => match err {
                ValidationError::InvalidUrl(_) => "validation.invalid_url".to_string(),
                ValidationError::UnsupportedScheme(_) => {
                    "validation.unsupported_scheme".to_string()
                }
                ValidationError::UnknownSummaryType(_) => {
                    "validation.unknown_summary_type".to_string()
                }
            },
            PipelineError::Fetch(err) => match err.kind {
                FetchErrorKind::Timeout => "fetch.timeout".to_string(),
                FetchErrorKind::HttpStatus(code) => format!("fetch.http_status.{code}"),
                FetchErrorKind::Unreachable => "fetch.unreachable".to_string(),
                FetchErrorKind::TooManyRedirects => "fetch.too_many_redirects".to_string(),
            },
            PipelineError::Content(_) => "content.no_extractable_text".to_string(),
            PipelineError::Summarization(err) => {
                let kind = match err.kind {
                    SummarizationErrorKind::Auth => "auth",
                    SummarizationErrorKind::RateLimited => "rate_limited",
                    SummarizationErrorKind::Timeout => "timeout",
                    SummarizationErrorKind::ServiceError => "service_error",
                    SummarizationErrorKind::EmptyResponse => "empty_response",
                };
                format!("summarization.{kind}")
            }
            PipelineError::Cancelled => "cancelled".to_string(),
        }
    }
}
