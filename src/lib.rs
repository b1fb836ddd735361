//! # Pagebrief
//!
//! Fetch a web page, extract its readable text and a couple of representative
//! images, and have an LLM summarise it.
//!
//! ## Features
//!
//! - **Typed pipeline**: fetch, extract, prompt and summarise with a typed error per stage
//! - **Batch runs**: bounded concurrency, input-ordered results, cooperative cancellation
//! - **History**: in-memory record of results, exportable as JSON, Markdown or text

pub mod agent;
pub mod app;
pub mod assets;
pub mod batch;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod history;
pub mod logging;
pub mod pipeline;
pub mod prompt;
pub mod summary;

pub use app::SummaryApp;
pub use config::Config;
pub use error::PipelineError;
pub use history::{ExportFormat, HistoryStore};
pub use summary::{SummaryResult, SummaryType};
