//! Upstream bearer token cache.
//!
//! A token is reused for 23.5 hours after it was obtained, then refreshed on
//! the next request. The cache lock is held across the refresh, so concurrent
//! callers that find the token stale wait for a single login instead of each
//! issuing their own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub const TOKEN_TTL_MINUTES: i64 = 23 * 60 + 30;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("credential request failed: {0}")]
    Request(String),
    #[error("credential endpoint rejected login with status {status}")]
    Rejected { status: u16 },
    #[error("credential response did not contain a token")]
    MissingToken,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("upstream token unavailable: {0}")]
    Unavailable(#[from] CredentialError),
}

/// Exchanges configured credentials for a fresh bearer token.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch_token(&self) -> Result<String, CredentialError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Debug)]
pub struct AuthToken {
    pub value: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub struct TokenCache {
    source: Arc<dyn CredentialSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    current: Mutex<Option<AuthToken>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self {
        Self::with_clock(source, Arc::new(SystemClock))
    }

    pub fn with_clock(source: Arc<dyn CredentialSource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock, ttl: Duration::minutes(TOKEN_TTL_MINUTES), current: Mutex::new(None) }
    }

    /// Returns the cached token while fresh, otherwise logs in again.
    ///
    /// A failed refresh leaves the previous entry untouched.
    pub async fn get_token(&self) -> Result<SecretString, TokenError> {
        let mut current = self.current.lock().await;
        let now = self.clock.now();

        if let Some(token) = current.as_ref().filter(|token| token.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let value = match self.source.fetch_token().await {
            Ok(value) => value,
            Err(error) => {
                warn!(
                    event_name = "platform.token.refresh_failed",
                    error = %error,
                    "upstream token refresh failed"
                );
                return Err(error.into());
            }
        };

        let token = AuthToken { value: value.into(), expires_at: now + self.ttl };
        info!(
            event_name = "platform.token.refreshed",
            expires_at = %token.expires_at.to_rfc3339(),
            "upstream token refreshed"
        );
        let secret = token.value.clone();
        *current = Some(token);
        Ok(secret)
    }

    /// Drops the cached token so the next request logs in again.
    pub async fn invalidate(&self) {
        let mut current = self.current.lock().await;
        if current.take().is_some() {
            info!(event_name = "platform.token.invalidated", "upstream token invalidated");
        }
    }

    pub async fn cached_expiry(&self) -> Option<DateTime<Utc>> {
        self.current.lock().await.as_ref().map(|token| token.expires_at)
    }
}

pub fn bearer(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}
