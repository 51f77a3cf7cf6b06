//! Client credentials authentication against the realm token endpoint.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::MAX_TOKEN_REFRESH_SKEW_SECS;
use crate::{KeycloakConfig, KeycloakCredentials, KeycloakError, KeycloakResult};

/// OAuth2 token response from Keycloak.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// OAuth2 error response from Keycloak.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Access token with the expiry computed at acquisition time.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CachedToken {
    /// Returns true if the token is expired or will expire within the grace period.
    fn is_expired(&self, grace_period: TimeDelta) -> bool {
        Utc::now()
            .checked_add_signed(grace_period)
            .map_or(true, |deadline| deadline >= self.expires_at)
    }
}

#[derive(Debug)]
enum TokenState {
    Disconnected,
    Active(CachedToken),
}

/// Holds the access token of a connected client.
///
/// The state lock is held across check-then-refresh, so concurrent callers
/// share a single refresh.
#[derive(Debug)]
pub struct TokenCache {
    credentials: Arc<KeycloakCredentials>,
    token_url: String,
    http_client: reqwest::Client,
    state: Mutex<TokenState>,
    /// Refresh this long before expiry.
    grace_period: TimeDelta,
}

impl TokenCache {
    /// Creates a disconnected token cache.
    pub fn new(
        config: &KeycloakConfig,
        credentials: Arc<KeycloakCredentials>,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            credentials,
            token_url: config.token_url(),
            http_client,
            state: Mutex::new(TokenState::Disconnected),
            grace_period: refresh_skew(config.token_refresh_skew_secs),
        }
    }

    /// Acquires a token, replacing any previous one.
    #[instrument(skip(self), fields(client_id = %self.credentials.client_id))]
    pub async fn connect(&self) -> KeycloakResult<()> {
        let mut state = self.state.lock().await;
        let token = self.acquire_token().await?;
        *state = TokenState::Active(token);
        Ok(())
    }

    /// Drops the token; later calls fail with `NotConnected` until `connect`.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        *state = TokenState::Disconnected;
    }

    /// Returns true if a token has been acquired.
    pub async fn is_connected(&self) -> bool {
        matches!(*self.state.lock().await, TokenState::Active(_))
    }

    /// Gets a valid access token, refreshing it if it is about to expire.
    pub async fn get_token(&self) -> KeycloakResult<String> {
        let mut state = self.state.lock().await;
        match &*state {
            TokenState::Disconnected => Err(KeycloakError::NotConnected),
            TokenState::Active(token) if !token.is_expired(self.grace_period) => {
                Ok(token.access_token.clone())
            }
            TokenState::Active(_) => {
                debug!("Access token expired, refreshing");
                let token = self.acquire_token().await?;
                let access_token = token.access_token.clone();
                *state = TokenState::Active(token);
                Ok(access_token)
            }
        }
    }

    /// Replaces a token the server rejected.
    ///
    /// If another caller already replaced `rejected`, the newer token is
    /// returned without another round trip.
    pub async fn refresh(&self, rejected: &str) -> KeycloakResult<String> {
        let mut state = self.state.lock().await;
        match &*state {
            TokenState::Disconnected => Err(KeycloakError::NotConnected),
            TokenState::Active(token) if token.access_token != rejected => {
                Ok(token.access_token.clone())
            }
            TokenState::Active(_) => {
                debug!("Access token rejected, refreshing");
                let token = self.acquire_token().await?;
                let access_token = token.access_token.clone();
                *state = TokenState::Active(token);
                Ok(access_token)
            }
        }
    }

    /// Performs the client credentials grant.
    async fn acquire_token(&self) -> KeycloakResult<CachedToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret(),
            ),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| KeycloakError::Auth(format!("Token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KeycloakError::Auth(format!("Token request failed: {e}")))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(description) => format!("{}: {description}", e.error),
                    None => e.error,
                })
                .unwrap_or(body);
            return Err(KeycloakError::Auth(format!(
                "Token request failed with status {status}: {reason}"
            )));
        }

        let token_response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| KeycloakError::Auth(format!("Failed to parse token response: {e}")))?;

        let expires_at = expiry_from(token_response.expires_in).ok_or_else(|| {
            KeycloakError::Auth(format!(
                "invalid expires_in in token response: {}",
                token_response.expires_in
            ))
        })?;

        debug!(
            "Acquired new token, expires at {}",
            expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at,
        })
    }
}

/// Refresh window for a configured skew, clamped to the accepted range.
fn refresh_skew(secs: i64) -> TimeDelta {
    TimeDelta::try_seconds(secs.clamp(0, MAX_TOKEN_REFRESH_SKEW_SECS))
        .unwrap_or_else(TimeDelta::zero)
}

/// Absolute expiry of a token valid for `expires_in` seconds from now.
fn expiry_from(expires_in: i64) -> Option<DateTime<Utc>> {
    if expires_in < 0 {
        return None;
    }
    TimeDelta::try_seconds(expires_in).and_then(|ttl| Utc::now().checked_add_signed(ttl))
}
