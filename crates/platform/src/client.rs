use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hookrelay_core::config::{AppConfig, UpstreamUrlError};
use hookrelay_core::{ApplicationError, OutboundReply};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::token::{bearer, CredentialError, CredentialSource, TokenCache, TokenError};

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Url(#[from] UpstreamUrlError),
    #[error("request to upstream failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl PlatformError {
    fn into_application_error(self) -> ApplicationError {
        match self {
            Self::Token(error) => ApplicationError::UpstreamCredential(error.to_string()),
            other => ApplicationError::Delivery(other.to_string()),
        }
    }
}

pub fn http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(Duration::from_secs(timeout_secs)).build()
}

pub fn login_body(username: &str, password: &SecretString) -> Value {
    json!({"username": username, "password": password.expose_secret()})
}

pub fn reply_body(content: &str) -> Value {
    json!({"message": {"content": content, "private": false}})
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

/// Logs in against the upstream credential endpoint.
pub struct CredentialClient {
    http: Client,
    login_url: String,
    username: String,
    password: SecretString,
}

impl CredentialClient {
    pub fn new(http: Client, config: &AppConfig) -> Self {
        Self {
            http,
            login_url: config.login_url(),
            username: config.upstream.username.clone(),
            password: config.upstream.password.clone(),
        }
    }
}

#[async_trait]
impl CredentialSource for CredentialClient {
    async fn fetch_token(&self) -> Result<String, CredentialError> {
        let response = self
            .http
            .post(&self.login_url)
            .json(&login_body(&self.username, &self.password))
            .send()
            .await
            .map_err(|error| CredentialError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CredentialError::Rejected { status: status.as_u16() });
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|error| CredentialError::Request(error.to_string()))?;
        body.token.filter(|token| !token.trim().is_empty()).ok_or(CredentialError::MissingToken)
    }
}

/// Posts replies into upstream conversations with the cached bearer token.
pub struct PlatformClient {
    http: Client,
    config: Arc<AppConfig>,
    tokens: Arc<TokenCache>,
}

impl PlatformClient {
    pub fn new(http: Client, config: Arc<AppConfig>, tokens: Arc<TokenCache>) -> Self {
        Self { http, config, tokens }
    }

    /// Wires a client whose token cache logs in through the same HTTP client.
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, reqwest::Error> {
        let http = http_client(config.upstream.timeout_secs)?;
        let credentials = CredentialClient::new(http.clone(), &config);
        let tokens = Arc::new(TokenCache::new(Arc::new(credentials)));
        Ok(Self::new(http, config, tokens))
    }

    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    async fn post_reply(&self, conversation_id: &str, content: &str) -> Result<(), PlatformError> {
        let url = self.config.reply_url(conversation_id)?;
        let token = self.tokens.get_token().await?;
        let response = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, bearer(&token))
            .json(&reply_body(content))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }
        let body = response.text().await.unwrap_or_default();
        Err(PlatformError::Status { status, body })
    }
}

#[async_trait]
impl OutboundReply for PlatformClient {
    async fn send_reply(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<(), ApplicationError> {
        match self.post_reply(conversation_id, content).await {
            Ok(()) => {
                info!(
                    event_name = "platform.reply.sent",
                    conversation_id = %conversation_id,
                    "reply delivered upstream"
                );
                Ok(())
            }
            Err(error) => {
                let error = error.into_application_error();
                warn!(
                    event_name = "platform.reply.failed",
                    conversation_id = %conversation_id,
                    error_class = error.error_class(),
                    error = %error,
                    "reply delivery failed"
                );
                Err(error)
            }
        }
    }
}
