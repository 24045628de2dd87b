//! Bearer-token source for the Gmail adapter.
//!
//! Either a pre-issued access token, or an `authorized_user` token file whose
//! refresh token is exchanged for short-lived access tokens. The interactive
//! consent flow that produces the token file lives outside this service.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{ConfigError, ProviderError};

/// Google's OAuth token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the provider-reported expiry.
const CACHE_SKEW_SECONDS: i64 = 60;

/// Used when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Supplies the bearer token for every Gmail request.
pub enum GmailAuth {
    /// A fixed access token (e.g. from `GMAIL_ACCESS_TOKEN`).
    Static(SecretString),
    /// Refresh-token exchange with an in-memory access token cache.
    Refresh(RefreshingToken),
}

impl GmailAuth {
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self::Static(SecretString::from(token.into()))
    }

    /// Load an `authorized_user` token file.
    pub fn from_token_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::MissingRequired {
            key: "GMAIL_TOKEN_PATH".into(),
            hint: format!(
                "Could not read token file {}: {e}. Authorize the account first or set GMAIL_ACCESS_TOKEN.",
                path.display()
            ),
        })?;
        let file: TokenFile = serde_json::from_str(&content).map_err(|e| {
            ConfigError::ParseError(format!("token file {}: {e}", path.display()))
        })?;

        if let Some(kind) = file.kind.as_deref()
            && kind != "authorized_user"
        {
            return Err(ConfigError::InvalidValue {
                key: "GMAIL_TOKEN_PATH".into(),
                message: format!("unsupported credential type '{kind}', expected 'authorized_user'"),
            });
        }

        Ok(Self::Refresh(RefreshingToken::new(
            file.client_id,
            SecretString::from(file.client_secret),
            SecretString::from(file.refresh_token),
        )))
    }

    /// Override the token endpoint (only meaningful for `Refresh`).
    pub fn with_token_url(self, url: impl Into<String>) -> Self {
        match self {
            Self::Refresh(mut refreshing) => {
                refreshing.token_url = url.into();
                Self::Refresh(refreshing)
            }
            other => other,
        }
    }

    /// Current access token, refreshing if needed.
    pub async fn access_token(&self) -> Result<String, ProviderError> {
        match self {
            Self::Static(token) => Ok(token.expose_secret().to_string()),
            Self::Refresh(refreshing) => refreshing.access_token().await,
        }
    }
}

impl std::fmt::Debug for GmailAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("GmailAuth::Static(..)"),
            Self::Refresh(r) => f
                .debug_struct("GmailAuth::Refresh")
                .field("client_id", &r.client_id)
                .field("token_url", &r.token_url)
                .finish_non_exhaustive(),
        }
    }
}

/// On-disk `authorized_user` credentials.
#[derive(Deserialize)]
struct TokenFile {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    client_id: String,
    client_secret: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct CachedAccessToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Refresh-token credentials plus the cached access token.
pub struct RefreshingToken {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    refresh_token: SecretString,
    token_url: String,
    cached: Mutex<Option<CachedAccessToken>>,
}

impl RefreshingToken {
    pub fn new(client_id: String, client_secret: SecretString, refresh_token: SecretString) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            refresh_token,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            cached: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Utc::now()
        {
            return Ok(token.access_token.clone());
        }

        let fresh = self.exchange().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn exchange(&self) -> Result<CachedAccessToken, ProviderError> {
        tracing::debug!(token_url = %self.token_url, "Refreshing Gmail access token");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("refresh_token", self.refresh_token.expose_secret()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Auth(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Auth(format!("failed to read token response: {e}")))?;

        if !status.is_success() {
            return Err(ProviderError::Auth(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                truncate(&body, 200)
            )));
        }

        let payload: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Auth(format!("invalid token response: {e}")))?;

        let lifetime = payload
            .expires_in
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS)
            .saturating_sub(CACHE_SKEW_SECONDS);

        Ok(CachedAccessToken {
            access_token: payload.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        })
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
