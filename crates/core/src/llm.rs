use crate::error::ModelError;
use crate::traits::LanguageModel;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GROQ_MODEL: &str = "openai/gpt-oss-20b";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ChatModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub system_prompt: Option<String>,
}

impl ChatModelConfig {
    /// OpenAI settings from `OPENAI_API_KEY`, `OPENAI_MODEL` and `OPENAI_BASE_URL`.
    pub fn openai_from_env() -> Result<Self, ModelError> {
        let api_key = non_empty_env("OPENAI_API_KEY")
            .ok_or_else(|| ModelError::Config("OPENAI_API_KEY not set".to_string()))?;

        Ok(Self {
            api_key,
            base_url: non_empty_env("OPENAI_BASE_URL").unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: non_empty_env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            temperature: 0.2,
            system_prompt: None,
        })
    }

    /// Groq settings from `GROQ_API_KEY` and `GROQ_MODEL`; falls back to the
    /// OpenAI settings when no Groq key is present.
    pub fn groq_from_env() -> Result<Self, ModelError> {
        let Some(api_key) = non_empty_env("GROQ_API_KEY") else {
            return Ok(Self {
                temperature: 0.0,
                ..Self::openai_from_env()?
            });
        };

        Ok(Self {
            api_key,
            base_url: GROQ_BASE_URL.to_string(),
            model: non_empty_env("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            temperature: 0.0,
            system_prompt: None,
        })
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for any OpenAI-compatible endpoint.
pub struct ChatModel {
    config: ChatModelConfig,
    client: Client,
}

impl ChatModel {
    pub fn new(config: ChatModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ModelError::Config(error.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn messages<'a>(&'a self, prompt: &'a str) -> Vec<ChatMessage<'a>> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.config.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        messages
    }
}

#[async_trait]
impl LanguageModel for ChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.config.model,
            messages: self.messages(prompt),
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                warn!(error = %error, "chat completion request failed");
                ModelError::Network(error.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "chat completion api error");
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|error| ModelError::Parse(error.to_string()))?;

        let content = first_content(payload)?;

        debug!(
            model = %self.config.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "chat completion"
        );

        Ok(content)
    }
}

fn first_content(payload: ChatResponse) -> Result<String, ModelError> {
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ModelError::Api("response had no choices".to_string()))
}
