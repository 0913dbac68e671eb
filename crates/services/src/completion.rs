use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Text completion against a chat-completions backend.
///
/// Grading code depends on this trait, not on a concrete HTTP client, so
/// tests can script responses and failures.
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    /// Run one system + user exchange and return the assistant text.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError>;
}

#[derive(Clone, Debug)]
pub struct CompletionConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl CompletionConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("IELTS_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("IELTS_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("IELTS_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        let timeout = env::var("IELTS_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);
        Some(Self {
            base_url,
            api_key,
            model,
            timeout,
        })
    }
}

/// Production completion client.
///
/// Every request carries the configured timeout; a slow or unreachable
/// backend fails the call instead of hanging the grading pipeline.
#[derive(Clone)]
pub struct OpenAiCompletion {
    client: Client,
    config: Option<CompletionConfig>,
}

impl OpenAiCompletion {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(CompletionConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<CompletionConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait::async_trait]
impl CompletionService for OpenAiCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CompletionError> {
        let config = self.config.as_ref().ok_or(CompletionError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .timeout(config.timeout)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CompletionError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
