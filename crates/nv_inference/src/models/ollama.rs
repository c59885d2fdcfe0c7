use std::fmt;

use async_trait::async_trait;
use nv_core::{ArticleDigest, Error, Result, Summarizer};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{build_prompt, parse_digest, prepare_input, status_error, validate_digest};
use crate::SummarizerConfig;

const DEFAULT_MODEL: &str = "gemma3:12b";
const DEFAULT_PORT: u16 = 11434;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    endpoint: Url,
    model_name: String,
}

impl OllamaConfig {
    /// Reads host, port and model from a URL such as `http://localhost:11434/gemma3:12b`.
    pub fn from_model_url(model_url: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::Configuration(format!("model URL {} {}", model_url, reason));
        let parsed = Url::parse(model_url).map_err(|e| invalid(&format!("is invalid: {}", e)))?;
        if !parsed.has_host() {
            return Err(invalid("has no host"));
        }
        let model_name = parsed.path().trim_start_matches('/').to_string();

        let mut endpoint = parsed;
        if endpoint.port().is_none() {
            endpoint
                .set_port(Some(DEFAULT_PORT))
                .map_err(|_| invalid("does not accept a port"))?;
        }
        endpoint.set_path("/api/generate");
        endpoint.set_query(None);
        endpoint.set_fragment(None);

        Ok(Self {
            endpoint,
            model_name: if model_name.is_empty() { DEFAULT_MODEL.to_string() } else { model_name },
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Summarizer backed by a locally served Ollama model.
pub struct OllamaSummarizer {
    client: Client,
    config: OllamaConfig,
    language: String,
    min_input_chars: usize,
    max_input_chars: usize,
    strip_markers: Vec<String>,
}

impl fmt::Debug for OllamaSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaSummarizer")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

impl OllamaSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: OllamaConfig::from_model_url(&config.model_url)?,
            language: config.language.clone(),
            min_input_chars: config.min_input_chars,
            max_input_chars: config.max_input_chars,
            strip_markers: config.strip_markers.clone(),
        })
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let endpoint = self.config.endpoint();
        let request = GenerateRequest {
            model: self.config.model_name(),
            prompt,
            stream: false,
        };

        let response = self.client.post(endpoint).json(&request).send().await.map_err(|e| {
            Error::Summarization(format!(
                "Ollama is not available at {}: {}. Please ensure Ollama is running and the model '{}' is installed.",
                endpoint,
                e,
                self.config.model_name()
            ))
        })?;

        if !response.status().is_success() {
            return Err(status_error(endpoint, response.status()));
        }

        let response = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| Error::Summarization(format!("Unexpected response from {}: {}", endpoint, e)))?;
        Ok(response.response.trim().to_string())
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn summarize(&self, text: &str) -> Result<ArticleDigest> {
        let input = prepare_input(text, self.min_input_chars, self.max_input_chars)?;
        let output = self.generate(build_prompt(&input, &self.language)).await?;

        let digest = parse_digest(&output, &self.strip_markers)?;
        validate_digest(&digest, &input)?;
        Ok(digest)
    }
}
