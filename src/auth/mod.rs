//! Bearer tokens for the calendar fetch.
//!
//! The poll loop never sees any of this: startup asks a [`TokenProvider`] for
//! a token once and either gets one or gives up.

pub mod device_code;
pub mod token_cache;

pub use device_code::DeviceCodeAuth;
pub use token_cache::TokenCache;

use crate::config::AuthConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Set this to skip the sign-in flow entirely.
pub const ACCESS_TOKEN_ENV: &str = "MEETLIGHT_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth is not configured: {0}")]
    NotConfigured(String),
    #[error("no cached credentials and interactive sign-in is disabled")]
    InteractionRequired,
    #[error("token request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("identity platform rejected the request: {error}: {description}")]
    Rejected { error: String, description: String },
    #[error("unexpected response from identity platform ({status}): {body}")]
    UnexpectedResponse { status: u16, body: String },
    #[error("device code expired before sign-in completed")]
    Expired,
    #[error("token cache error: {0}")]
    Cache(String),
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire_token(&self) -> Result<String, AuthError>;
}

/// A token handed over from outside, used as-is.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|token| !token.is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn acquire_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}

/// Pick the provider for this run: an explicit token from the environment
/// wins, otherwise the cached device-code flow.
pub fn build_provider(
    config: &AuthConfig,
    cache_path: PathBuf,
) -> Result<Box<dyn TokenProvider>, AuthError> {
    if let Some(token) = StaticToken::from_env() {
        info!("Using access token from {}", ACCESS_TOKEN_ENV);
        return Ok(Box::new(token));
    }
    Ok(Box::new(DeviceCodeAuth::from_config(config, cache_path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let provider = StaticToken::new("abc");
        assert_eq!(provider.acquire_token().await.unwrap(), "abc");
    }

    #[test]
    fn test_missing_client_id_is_not_configured() {
        std::env::remove_var(ACCESS_TOKEN_ENV);
        let err = build_provider(&AuthConfig::default(), PathBuf::from("/tmp/unused.json"))
            .err()
            .unwrap();
        assert!(matches!(err, AuthError::NotConfigured(_)));
    }
}
