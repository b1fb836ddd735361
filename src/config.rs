//! Configuration loading and management for pagebrief.
//!
//! Loads settings from `pagebrief.toml` with environment variable overrides for
//! sensitive data. Every field has a default, so running without a config file
//! works as long as `GEMINI_API_KEY` is set.

use crate::agent::{GeminiSettings, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::assets::{DEFAULT_MAX_IMAGES, DEFAULT_MIN_IMAGE_WIDTH};
use crate::extractor::DEFAULT_MAX_TEXT_CHARS;
use crate::fetcher::{FetchSettings, DEFAULT_MAX_BODY_BYTES, DEFAULT_USER_AGENT};
use crate::pipeline::{PipelineSettings, RetryPolicy};
use crate::prompt::DEFAULT_MAX_PROMPT_CHARS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "pagebrief.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required API key for provider: {0}")]
    MissingApiKey(String),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// LLM provider, only "gemini" is supported
    pub provider: String,
    /// Model identifier (e.g., "gemini-2.5-flash-lite")
    pub model: String,
    /// Base URL of the generation API
    pub endpoint: String,
    /// Timeout for a single generation request
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 60,
        }
    }
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub gemini_key: Option<String>,
}

/// Page fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub redirect_limit: usize,
    pub user_agent: String,
    /// Response bytes read per page
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            redirect_limit: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Size limits applied while extracting and prompting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Characters of page text kept after extraction
    pub max_text_chars: usize,
    /// Characters allowed in the prompt sent to the service
    pub max_prompt_chars: usize,
    pub max_images: usize,
    pub min_image_width: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            max_images: DEFAULT_MAX_IMAGES,
            min_image_width: DEFAULT_MIN_IMAGE_WIDTH,
        }
    }
}

/// Batch execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Pipelines running at the same time
    pub workers: usize,
    /// Extra attempts for transient summarisation failures
    pub max_retries: u32,
    /// First retry delay, doubled on every further attempt
    pub retry_base_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_retries: 2,
            retry_base_delay_ms: 1_000,
        }
    }
}

/// In-memory history configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HistoryConfig {
    /// Also record failed results
    pub record_failures: bool,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl Config {
    /// Load configuration from the default location (pagebrief.toml in cwd or home)
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::read_file(&path)?,
            None => Config::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override API keys from environment variables
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                self.api.gemini_key = Some(key);
            }
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE_NAME);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        dirs::home_dir()
            .map(|home| home.join(".config").join("pagebrief").join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    /// Reject values that would stall or disable the pipeline
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.provider != "gemini" {
            return Err(ConfigError::Invalid {
                field: "agent.provider",
                reason: format!("unsupported provider '{}'", self.agent.provider),
            });
        }
        if self.batch.workers == 0 {
            return Err(ConfigError::Invalid {
                field: "batch.workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.fetch.timeout_secs == 0 || self.agent.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_secs",
                reason: "timeouts must be greater than zero".to_string(),
            });
        }
        if self.fetch.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch.max_body_bytes",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the API key for the configured provider
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api
            .gemini_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey(self.agent.provider.clone()))
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            user_agent: self.fetch.user_agent.clone(),
            max_body_bytes: self.fetch.max_body_bytes,
        }
    }

    pub fn gemini_settings(&self) -> GeminiSettings {
        GeminiSettings {
            api_key: self.api.gemini_key.clone(),
            model: self.agent.model.clone(),
            endpoint: self.agent.endpoint.clone(),
            timeout: Duration::from_secs(self.agent.timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.batch.max_retries,
            base_delay: Duration::from_millis(self.batch.retry_base_delay_ms),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            max_text_chars: self.limits.max_text_chars,
            max_prompt_chars: self.limits.max_prompt_chars,
            max_images: self.limits.max_images,
            min_image_width: self.limits.min_image_width,
            retry: self.retry_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("[batch]\nworkers = 8\n").unwrap();
        assert_eq!(config.batch.workers, 8);
        assert_eq!(config.batch.max_retries, 2);
        assert_eq!(config.limits.max_images, 2);
        assert_eq!(config.limits.min_image_width, 100);
        assert_eq!(config.agent.model, DEFAULT_MODEL);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[agent]\nmodel = \"gemini-2.5-flash\"\n\n[limits]\nmax_text_chars = 500\n\n[history]\nrecord_failures = true"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.agent.model, "gemini-2.5-flash");
        assert_eq!(config.limits.max_text_chars, 500);
        assert!(config.history.record_failures);
    }

    #[test]
    fn rejects_zero_workers() {
        let config: Config = toml::from_str("[batch]\nworkers = 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "batch.workers", .. })
        ));
    }

    #[test]
    fn body_limit_flows_into_fetch_settings() {
        let config: Config = toml::from_str("[fetch]\nmax_body_bytes = 2048\n").unwrap();
        assert_eq!(config.fetch_settings().max_body_bytes, 2048);
        assert_eq!(Config::default().fetch.max_body_bytes, DEFAULT_MAX_BODY_BYTES);

        let config: Config = toml::from_str("[fetch]\nmax_body_bytes = 0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "fetch.max_body_bytes", .. })
        ));
    }

    #[test]
    fn rejects_unknown_provider() {
        let config: Config = toml::from_str("[agent]\nprovider = \"openai\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[batch\nworkers = ").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
