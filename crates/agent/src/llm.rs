use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hookrelay_core::config::{LlmConfig, LlmProvider};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const OLLAMA_BASE_URL: &str = "http://127.0.0.1:11434";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm api error: {0}")]
    Api(String),
    #[error("llm response contained no text")]
    EmptyResponse,
}

/// Single-turn completion over the configured provider's HTTP API.
#[derive(Clone)]
pub struct HttpLlmClient {
    http: Client,
    provider: LlmProvider,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(match config.provider {
                LlmProvider::OpenAi => OPENAI_BASE_URL,
                LlmProvider::Anthropic => ANTHROPIC_BASE_URL,
                LlmProvider::Ollama => OLLAMA_BASE_URL,
            })
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            http,
            provider: config.provider,
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    fn api_key(&self) -> &str {
        self.api_key.as_ref().map(|key| key.expose_secret()).unwrap_or_default()
    }

    async fn post(&self, request: reqwest::RequestBuilder) -> Result<Value, LlmError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("{} {}", status, body)));
        }
        Ok(response.json().await?)
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });
        let request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key())
            .json(&body);
        let data: OpenAiResponse = serde_json::from_value(self.post(request).await?)
            .map_err(|error| LlmError::Api(error.to_string()))?;
        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        });
        let request = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let data: AnthropicResponse = serde_json::from_value(self.post(request).await?)
            .map_err(|error| LlmError::Api(error.to_string()))?;
        let text: String = data
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        Ok(text)
    }

    async fn complete_ollama(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false,
        });
        let request = self.http.post(format!("{}/api/chat", self.base_url)).json(&body);
        let data: OllamaResponse = serde_json::from_value(self.post(request).await?)
            .map_err(|error| LlmError::Api(error.to_string()))?;
        data.message.map(|message| message.content).ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let text = match self.provider {
            LlmProvider::OpenAi => self.complete_openai(prompt).await?,
            LlmProvider::Anthropic => self.complete_anthropic(prompt).await?,
            LlmProvider::Ollama => self.complete_ollama(prompt).await?,
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse.into());
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}
