//! Error types for the Keycloak connector.

use thiserror::Error;
use xavyo_connector::error::ConnectorError;

/// Result type alias using `KeycloakError`.
pub type KeycloakResult<T> = Result<T, KeycloakError>;

/// Errors that can occur when interacting with Keycloak.
#[derive(Debug, Error)]
pub enum KeycloakError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Client credentials grant failed or the token could not be refreshed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The client was used before `connect()` succeeded.
    #[error("Client is not connected")]
    NotConnected,

    /// Network-level failure.
    #[error("HTTP error during {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: reqwest::Error,
    },

    /// Admin API answered with a non-success status.
    #[error("Admin API error during {context}: {status} - {message}")]
    Api {
        context: String,
        status: u16,
        message: String,
    },

    /// Response body did not match the expected representation.
    #[error("Failed to decode response for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Entitlement id is not of the form `group:<groupID>:membership`.
    #[error("Invalid entitlement ID format: {0}")]
    InvalidEntitlementFormat(String),

    /// Grant principal is not a user resource.
    #[error("Principal of type '{resource_type}' cannot hold {entitlement_id}")]
    InvalidPrincipal {
        resource_type: String,
        entitlement_id: String,
    },

    /// User could not be resolved.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Group could not be resolved.
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Page token is not an offset this connector handed out.
    #[error("Invalid page token: {0}")]
    InvalidPageToken(String),
}

impl KeycloakError {
    pub(crate) fn transport(context: impl Into<String>, source: reqwest::Error) -> Self {
        KeycloakError::Transport {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn decode(context: impl Into<String>, source: serde_json::Error) -> Self {
        KeycloakError::Decode {
            context: context.into(),
            source,
        }
    }

    /// Returns true if the admin API answered 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, KeycloakError::Api { status: 404, .. })
    }

    /// Returns true if the admin API answered 409.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, KeycloakError::Api { status: 409, .. })
    }
}

impl From<KeycloakError> for ConnectorError {
    fn from(err: KeycloakError) -> Self {
        match err {
            KeycloakError::Config(message) => ConnectorError::InvalidConfiguration { message },
            KeycloakError::Auth(message) => ConnectorError::AuthenticationFailed { message },
            KeycloakError::NotConnected => ConnectorError::NotConnected,
            KeycloakError::Transport { context, source } if source.is_timeout() => {
                ConnectorError::Timeout { operation: context }
            }
            KeycloakError::Transport { context, source } => {
                ConnectorError::transport_with_source(context, source)
            }
            KeycloakError::Api {
                context, status, ..
            } if status == 401 || status == 403 => ConnectorError::AuthenticationFailed {
                message: format!("{context} rejected with status {status}"),
            },
            KeycloakError::Api {
                context,
                status,
                message,
            } => ConnectorError::transport(context, format!("{status} - {message}")),
            KeycloakError::Decode { context, source } => ConnectorError::Decode {
                operation: context,
                message: source.to_string(),
            },
            KeycloakError::InvalidEntitlementFormat(entitlement_id) => {
                ConnectorError::InvalidEntitlementFormat { entitlement_id }
            }
            KeycloakError::InvalidPrincipal {
                resource_type,
                entitlement_id,
            } => ConnectorError::InvalidPrincipal {
                resource_type,
                entitlement_id,
            },
            KeycloakError::UserNotFound(identifier) => ConnectorError::UserNotFound { identifier },
            KeycloakError::GroupNotFound(identifier) => {
                ConnectorError::GroupNotFound { identifier }
            }
            KeycloakError::InvalidPageToken(token) => ConnectorError::InvalidPageToken { token },
        }
    }
}
