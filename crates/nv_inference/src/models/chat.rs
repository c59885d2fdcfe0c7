use std::fmt;

use async_trait::async_trait;
use nv_core::{ArticleDigest, Error, Result, Summarizer};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{build_prompt, parse_digest, prepare_input, status_error, validate_digest};
use crate::SummarizerConfig;

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

/// Summarizer backed by an OpenAI-compatible chat completion API.
pub struct ChatSummarizer {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    language: String,
    min_input_chars: usize,
    max_input_chars: usize,
    strip_markers: Vec<String>,
}

impl fmt::Debug for ChatSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSummarizer")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl ChatSummarizer {
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Configuration("the chat summarizer requires an API key".to_string()))?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            language: config.language.clone(),
            min_input_chars: config.min_input_chars,
            max_input_chars: config.max_input_chars,
            strip_markers: config.strip_markers.clone(),
        })
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Summarization(format!("{} is unavailable: {}", endpoint, e)))?;

        if !response.status().is_success() {
            return Err(status_error(&endpoint, response.status()));
        }

        let response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::Summarization(format!("Unexpected response from {}: {}", endpoint, e)))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| Error::Summarization(format!("{} returned no choices", endpoint)))
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    fn name(&self) -> &str {
        "chat"
    }

    async fn summarize(&self, text: &str) -> Result<ArticleDigest> {
        let input = prepare_input(text, self.min_input_chars, self.max_input_chars)?;
        let output = self.complete(build_prompt(&input, &self.language)).await?;
        tracing::debug!("🤖 {} answered with {} chars", self.model, output.len());

        let digest = parse_digest(&output, &self.strip_markers)?;
        validate_digest(&digest, &input)?;
        Ok(digest)
    }
}
