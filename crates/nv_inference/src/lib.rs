use std::sync::Arc;
use std::time::Duration;

use nv_core::{Error, Result, Summarizer};
use serde::Deserialize;

pub mod models;

pub use models::chat::ChatSummarizer;
pub use models::ollama::{OllamaConfig, OllamaSummarizer};

/// Summarizer variants this build can create.
pub const SUMMARIZERS: &[&str] = &["chat", "ollama"];

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// One of [`SUMMARIZERS`]
    pub kind: String,
    pub api_key: Option<String>,
    /// Base URL of the chat completion API
    pub base_url: String,
    /// Ollama endpoint with the model as path, e.g. `http://localhost:11434/gemma3:12b`
    pub model_url: String,
    /// Chat model name; for Ollama the model comes from `model_url`
    pub model: String,
    /// Language the headline and summary are written in
    pub language: String,
    pub min_input_chars: usize,
    pub max_input_chars: usize,
    pub request_timeout_ms: u64,
    /// Editorial markers removed from model output, e.g. "(dopolnjeno)"
    pub strip_markers: Vec<String>,
}

impl std::fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model_url", &self.model_url)
            .field("model", &self.model)
            .field("language", &self.language)
            .field("min_input_chars", &self.min_input_chars)
            .field("max_input_chars", &self.max_input_chars)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            kind: "chat".to_string(),
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model_url: "http://localhost:11434/gemma3:12b".to_string(),
            model: "gpt-3.5-turbo-16k".to_string(),
            language: "Slovenian".to_string(),
            min_input_chars: 120,
            max_input_chars: 12_000,
            request_timeout_ms: 60_000,
            strip_markers: vec!["(dopolnjeno)".to_string()],
        }
    }
}

impl SummarizerConfig {
    pub fn validate(&self) -> Result<()> {
        match self.kind.as_str() {
            "chat" => {
                if self.api_key.as_deref().map_or(true, str::is_empty) {
                    return Err(Error::Configuration(
                        "the chat summarizer requires an API key".to_string(),
                    ));
                }
                url::Url::parse(&self.base_url).map_err(|e| {
                    Error::Configuration(format!("invalid summarizer base URL: {}", e))
                })?;
            }
            "ollama" => {
                OllamaConfig::from_model_url(&self.model_url)?;
            }
            other => {
                return Err(Error::Configuration(format!(
                    "unknown summarizer '{}', expected one of: {}",
                    other,
                    SUMMARIZERS.join(", ")
                )))
            }
        }
        if self.min_input_chars > self.max_input_chars {
            return Err(Error::Configuration(
                "min_input_chars cannot exceed max_input_chars".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Configuration(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Build the summarizer selected by the configuration.
pub fn create_summarizer(config: &SummarizerConfig) -> Result<Arc<dyn Summarizer>> {
    config.validate()?;
    match config.kind.as_str() {
        "chat" => Ok(Arc::new(ChatSummarizer::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaSummarizer::new(config)?)),
        other => Err(Error::Configuration(format!("unknown summarizer '{}'", other))),
    }
}

pub mod prelude {
    pub use super::{create_summarizer, SummarizerConfig};
    pub use nv_core::{ArticleDigest, Error, Result, Summarizer};
}
