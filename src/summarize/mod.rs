use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::SummarizerConfig;
use crate::utils;

const SYSTEM_PROMPT: &str = "You are an assistant that summarizes YouTube transcripts into concise, \
structured notes. Adapt your style depending on the type of video:\n\n\
- If it's a recipe, list ingredients and step-by-step instructions.\n\
- If it's a travel or destination video, create an itinerary with places, activities and tips.\n\
- If it's an educational video, talk or tutorial, list key points, definitions and takeaways.\n\n\
Keep notes clear, skimmable and free of filler words. Use Markdown with emojis if useful. \
Keep notes concise, aim for 400-500 words.";

#[derive(thiserror::Error, Debug)]
pub enum SummarizeError {
    #[error("Summarizer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Summarizer returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Summarizer returned no content")]
    EmptyResponse,
}

/// Turns a transcript into notes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Summarizer backed by an OpenAI-compatible chat completions endpoint (Groq by default)
pub struct GroqSummarizer {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_input_chars: usize,
    temperature: f32,
    max_tokens: u32,
}

impl GroqSummarizer {
    pub fn new(client: Client, config: &SummarizerConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_input_chars: config.max_input_chars,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn build_request(&self, transcript: &str) -> ChatRequest<'_> {
        let truncated = utils::truncate_chars(transcript, self.max_input_chars);

        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!(
                        "Here is the transcript:\n\n{}\n\nPlease create adaptive notes.",
                        truncated
                    ),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl Summarizer for GroqSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, SummarizeError> {
        let request = self.build_request(transcript);
        tracing::debug!("Requesting summary from {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Status {
                status: status.as_u16(),
                body: utils::truncate_with_ellipsis(&body, 200),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        extract_summary(parsed)
    }
}

fn extract_summary(response: ChatResponse) -> Result<String, SummarizeError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(SummarizeError::EmptyResponse)
}
