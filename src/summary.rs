//! Summary types - the request going into the pipeline and the result coming out.

use crate::error::{PipelineError, ValidationError};
use crate::extractor::ImageRef;
use crate::fetcher::validate_url;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Output style requested from the summarisation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    /// Two to three sentences
    #[default]
    Short,
    /// Several paragraphs with key points
    Detailed,
    /// A structured bullet list
    Bullet,
}

impl SummaryType {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryType::Short => "short",
            SummaryType::Detailed => "detailed",
            SummaryType::Bullet => "bullet",
        }
    }
}

impl fmt::Display for SummaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(SummaryType::Short),
            "detailed" => Ok(SummaryType::Detailed),
            // older front-ends used the long name
            "bullet" | "bullet_points" => Ok(SummaryType::Bullet),
            _ => Err(ValidationError::UnknownSummaryType(s.to_string())),
        }
    }
}

/// A validated request to summarise one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub url: Url,
    pub summary_type: SummaryType,
}

impl SummaryRequest {
    /// Validate and normalise the URL for a request.
    pub fn new(url: &str, summary_type: SummaryType) -> Result<Self, ValidationError> {
        Ok(Self {
            url: validate_url(url)?,
            summary_type,
        })
    }

    /// Build a request from untyped input, rejecting unknown summary types.
    pub fn parse(url: &str, summary_type: &str) -> Result<Self, ValidationError> {
        let summary_type = summary_type.parse()?;
        Self::new(url, summary_type)
    }
}

/// Outcome of summarising one URL.
///
/// Exactly one of `summary_text` and `error` is populated; the constructors
/// are the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryResult {
    url: String,
    summary_type: SummaryType,
    title: Option<String>,
    summary_text: Option<String>,
    images: Vec<ImageRef>,
    favicon: Option<Url>,
    error: Option<PipelineError>,
    created_at: DateTime<Utc>,
}

impl SummaryResult {
    /// A completed summary
    pub fn success(url: impl Into<String>, summary_type: SummaryType, summary_text: String) -> Self {
        Self {
            url: url.into(),
            summary_type,
            title: None,
            summary_text: Some(summary_text),
            images: Vec::new(),
            favicon: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// A failed run with its typed error
    pub fn failure(url: impl Into<String>, summary_type: SummaryType, error: PipelineError) -> Self {
        Self {
            url: url.into(),
            summary_type,
            title: None,
            summary_text: None,
            images: Vec::new(),
            favicon: None,
            error: Some(error),
            created_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.title = (!title.is_empty()).then_some(title);
        self
    }

    pub fn with_images(mut self, images: Vec<ImageRef>) -> Self {
        self.images = images;
        self
    }

    pub fn with_favicon(mut self, favicon: Option<Url>) -> Self {
        self.favicon = favicon;
        self
    }

    /// The URL as it was requested
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn summary_type(&self) -> SummaryType {
        self.summary_type
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn summary_text(&self) -> Option<&str> {
        self.summary_text.as_deref()
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    pub fn favicon(&self) -> Option<&Url> {
        self.favicon.as_ref()
    }

    pub fn error(&self) -> Option<&PipelineError> {
        self.error.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_success(&self) -> bool {
        self.summary_text.is_some()
    }
}
