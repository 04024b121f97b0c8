//! OAuth 2.0 device authorization grant against the Microsoft identity
//! platform, with a persisted token cache for silent reuse and refresh.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::token_cache::TokenCache;
use super::{AuthError, TokenProvider};
use crate::config::AuthConfig;

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

enum TokenReply {
    Granted(TokenResponse),
    Denied(OAuthErrorBody),
}

impl From<OAuthErrorBody> for AuthError {
    fn from(body: OAuthErrorBody) -> Self {
        AuthError::Rejected {
            error: body.error,
            description: body.error_description.unwrap_or_default(),
        }
    }
}

pub struct DeviceCodeAuth {
    client: Client,
    authority: String,
    client_id: String,
    scope: String,
    cache_path: PathBuf,
    interactive: bool,
}

impl DeviceCodeAuth {
    pub fn new(
        authority: impl Into<String>,
        client_id: impl Into<String>,
        scopes: &[String],
        cache_path: PathBuf,
        interactive: bool,
    ) -> Self {
        let mut scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();
        if !scopes.contains(&"offline_access") {
            scopes.push("offline_access");
        }
        Self {
            client: Client::new(),
            authority: authority.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            scope: scopes.join(" "),
            cache_path,
            interactive,
        }
    }

    pub fn from_config(config: &AuthConfig, cache_path: PathBuf) -> Result<Self, AuthError> {
        if config.client_id.trim().is_empty() {
            return Err(AuthError::NotConfigured(
                "set auth.client_id in the config file".to_string(),
            ));
        }
        Ok(Self::new(
            config.authority.clone(),
            config.client_id.trim(),
            &config.scopes,
            cache_path,
            config.interactive,
        ))
    }

    fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }

    fn device_code_url(&self) -> String {
        format!("{}/oauth2/v2.0/devicecode", self.authority)
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenReply, AuthError> {
        let response = self
            .client
            .post(self.token_url())
            .form(params)
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Transport)?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map(TokenReply::Granted)
                .map_err(|_| AuthError::UnexpectedResponse {
                    status: status.as_u16(),
                    body,
                });
        }

        serde_json::from_str(&body)
            .map(TokenReply::Denied)
            .map_err(|_| AuthError::UnexpectedResponse {
                status: status.as_u16(),
                body,
            })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenCache, AuthError> {
        debug!("Refreshing access token silently");
        let reply = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("scope", self.scope.as_str()),
            ])
            .await?;

        match reply {
            TokenReply::Granted(token) => Ok(TokenCache::new(
                token.access_token,
                token.refresh_token.or_else(|| Some(refresh_token.to_string())),
                token.expires_in,
                Utc::now(),
            )),
            TokenReply::Denied(body) => Err(body.into()),
        }
    }

    async fn sign_in(&self) -> Result<TokenCache, AuthError> {
        let response = self
            .client
            .post(self.device_code_url())
            .form(&[("client_id", self.client_id.as_str()), ("scope", self.scope.as_str())])
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Transport)?;
        if !status.is_success() {
            return Err(match serde_json::from_str::<OAuthErrorBody>(&body) {
                Ok(error) => error.into(),
                Err(_) => AuthError::UnexpectedResponse {
                    status: status.as_u16(),
                    body,
                },
            });
        }
        let device: DeviceCodeResponse =
            serde_json::from_str(&body).map_err(|_| AuthError::UnexpectedResponse {
                status: status.as_u16(),
                body: body.clone(),
            })?;

        match &device.message {
            Some(message) => println!("{message}"),
            None => println!(
                "To sign in, open {} and enter the code {}",
                device.verification_uri, device.user_code
            ),
        }
        info!("Waiting for device sign-in (code {})", device.user_code);

        let deadline = Instant::now() + Duration::from_secs(device.expires_in);
        let mut interval =
            Duration::from_secs(device.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS));

        loop {
            tokio::time::sleep(interval).await;
            if Instant::now() >= deadline {
                return Err(AuthError::Expired);
            }

            let reply = self
                .request_token(&[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", device.device_code.as_str()),
                ])
                .await?;

            match reply {
                TokenReply::Granted(token) => {
                    info!("Device sign-in complete");
                    return Ok(TokenCache::new(
                        token.access_token,
                        token.refresh_token,
                        token.expires_in,
                        Utc::now(),
                    ));
                }
                TokenReply::Denied(body) => match body.error.as_str() {
                    "authorization_pending" => continue,
                    "slow_down" => {
                        interval += SLOW_DOWN_STEP;
                        debug!("Asked to slow down, polling every {}s", interval.as_secs());
                    }
                    "expired_token" => return Err(AuthError::Expired),
                    _ => return Err(body.into()),
                },
            }
        }
    }

    fn store(&self, cache: &TokenCache) {
        if let Err(e) = cache.save(&self.cache_path) {
            warn!("Token obtained but not cached: {}", e);
        }
    }
}

#[async_trait]
impl TokenProvider for DeviceCodeAuth {
    async fn acquire_token(&self) -> Result<String, AuthError> {
        if let Some(cache) = TokenCache::load(&self.cache_path) {
            if cache.is_valid_at(Utc::now()) {
                debug!("Using cached access token");
                return Ok(cache.access_token);
            }
            if let Some(refresh_token) = cache.refresh_token.as_deref() {
                match self.refresh(refresh_token).await {
                    Ok(fresh) => {
                        self.store(&fresh);
                        return Ok(fresh.access_token);
                    }
                    Err(e) => warn!("Silent token refresh failed: {}", e),
                }
            }
        }

        if !self.interactive {
            return Err(AuthError::InteractionRequired);
        }

        let fresh = self.sign_in().await?;
        self.store(&fresh);
        Ok(fresh.access_token)
    }
}
