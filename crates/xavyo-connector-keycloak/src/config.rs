//! Configuration for the Keycloak connector.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::env::VarError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{KeycloakError, KeycloakResult};

/// Page size the admin API is queried with unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 300;

/// Largest accepted token refresh skew (one day).
pub const MAX_TOKEN_REFRESH_SKEW_SECS: i64 = 86_400;

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_token_refresh_skew_secs() -> i64 {
    10
}

/// How user resources are identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserIdentity {
    /// User resources carry the Keycloak user id.
    #[default]
    #[serde(rename = "id", alias = "provider_id")]
    ProviderId,
    /// User resources carry the username; provisioning resolves it to an id.
    Username,
}

impl UserIdentity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UserIdentity::ProviderId => "id",
            UserIdentity::Username => "username",
        }
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserIdentity {
    type Err = KeycloakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "id" | "provider_id" => Ok(UserIdentity::ProviderId),
            "username" => Ok(UserIdentity::Username),
            other => Err(KeycloakError::Config(format!(
                "Unknown user identity scheme: {other}"
            ))),
        }
    }
}

/// Keycloak connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeycloakConfig {
    /// Base URL of the Keycloak server (e.g. `https://sso.example.com`).
    pub server_url: String,
    /// Realm to sync.
    pub realm: String,
    /// Records requested per admin API page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Timeout for a single HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Refresh the access token this many seconds before it expires.
    #[serde(default = "default_token_refresh_skew_secs")]
    pub token_refresh_skew_secs: i64,
    /// How user resources are identified.
    #[serde(default)]
    pub user_identity: UserIdentity,
}

impl KeycloakConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> KeycloakConfigBuilder {
        KeycloakConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> KeycloakResult<Self> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> KeycloakResult<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let server_url = required(&reader, "KEYCLOAK_SERVER_URL")?;
        let realm = required(&reader, "KEYCLOAK_REALM")?;

        let page_size = optional(&reader, "KEYCLOAK_PAGE_SIZE", default_page_size())?;
        let request_timeout_secs = optional(
            &reader,
            "KEYCLOAK_REQUEST_TIMEOUT_SECS",
            default_request_timeout_secs(),
        )?;
        let token_refresh_skew_secs = optional(
            &reader,
            "KEYCLOAK_TOKEN_REFRESH_SKEW_SECS",
            default_token_refresh_skew_secs(),
        )?;
        let user_identity = optional(&reader, "KEYCLOAK_USER_IDENTITY", UserIdentity::default())?;

        let config = Self {
            server_url,
            realm,
            page_size,
            request_timeout_secs,
            token_refresh_skew_secs,
            user_identity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> KeycloakResult<()> {
        if self.server_url.trim().is_empty() {
            return Err(KeycloakError::Config("server_url is required".into()));
        }
        let url = url::Url::parse(&self.server_url)
            .map_err(|e| KeycloakError::Config(format!("Invalid server_url: {e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(KeycloakError::Config(format!(
                "Unsupported server_url scheme: {}",
                url.scheme()
            )));
        }
        if self.realm.trim().is_empty() {
            return Err(KeycloakError::Config("realm is required".into()));
        }
        if self.page_size == 0 {
            return Err(KeycloakError::Config("page_size must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(KeycloakError::Config(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if !(0..=MAX_TOKEN_REFRESH_SKEW_SECS).contains(&self.token_refresh_skew_secs) {
            return Err(KeycloakError::Config(format!(
                "token_refresh_skew_secs must be between 0 and {MAX_TOKEN_REFRESH_SKEW_SECS}"
            )));
        }
        Ok(())
    }

    /// Server URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    /// Admin REST API root for the configured realm.
    #[must_use]
    pub fn admin_url(&self) -> String {
        format!(
            "{}/admin/realms/{}",
            self.base_url(),
            urlencoding::encode(&self.realm)
        )
    }

    /// Token endpoint of the configured realm.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.base_url(),
            urlencoding::encode(&self.realm)
        )
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Builder for [`KeycloakConfig`].
#[derive(Debug, Default)]
pub struct KeycloakConfigBuilder {
    server_url: Option<String>,
    realm: Option<String>,
    page_size: Option<u32>,
    request_timeout_secs: Option<u64>,
    token_refresh_skew_secs: Option<i64>,
    user_identity: Option<UserIdentity>,
}

impl KeycloakConfigBuilder {
    #[must_use]
    pub fn server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = Some(server_url.into());
        self
    }

    #[must_use]
    pub fn realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    #[must_use]
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn token_refresh_skew_secs(mut self, secs: i64) -> Self {
        self.token_refresh_skew_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn user_identity(mut self, user_identity: UserIdentity) -> Self {
        self.user_identity = Some(user_identity);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> KeycloakResult<KeycloakConfig> {
        let config = KeycloakConfig {
            server_url: self.server_url.unwrap_or_default(),
            realm: self.realm.unwrap_or_default(),
            page_size: self.page_size.unwrap_or_else(default_page_size),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or_else(default_request_timeout_secs),
            token_refresh_skew_secs: self
                .token_refresh_skew_secs
                .unwrap_or_else(default_token_refresh_skew_secs),
            user_identity: self.user_identity.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Service-account client credentials.
#[derive(Debug)]
pub struct KeycloakCredentials {
    /// Confidential client id with the realm-management roles needed to
    /// read users/groups and manage group membership.
    pub client_id: String,
    /// Client secret.
    pub client_secret: SecretString,
}

impl KeycloakCredentials {
    /// Creates credentials and checks both parts are present.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> KeycloakResult<Self> {
        let credentials = Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Load credentials from environment variables.
    pub fn from_env() -> KeycloakResult<Self> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load credentials from a custom variable reader.
    pub fn from_reader<F>(reader: F) -> KeycloakResult<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let client_id = required(&reader, "KEYCLOAK_CLIENT_ID")?;
        let client_secret = required(&reader, "KEYCLOAK_CLIENT_SECRET")?;
        Self::new(client_id, client_secret)
    }

    /// Validates that neither part is empty.
    pub fn validate(&self) -> KeycloakResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(KeycloakError::Config("client_id is required".into()));
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err(KeycloakError::Config("client_secret is required".into()));
        }
        Ok(())
    }
}

fn required<F>(reader: &F, key: &str) -> KeycloakResult<String>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    match reader(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(KeycloakError::Config(format!("{key} is required"))),
    }
}

fn optional<F, T>(reader: &F, key: &str, default: T) -> KeycloakResult<T>
where
    F: Fn(&str) -> Result<String, VarError>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match reader(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| KeycloakError::Config(format!("Invalid {key}: {e}"))),
        _ => Ok(default),
    }
}
