//! Connector Framework error types
//!
//! The error taxonomy every connector reports to the sync engine, with a
//! transient/permanent split the engine uses for its own retry policy.

use thiserror::Error;

/// Error that can occur during sync or provisioning.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Authentication errors (permanent)
    /// Credentials were rejected or the token could not be refreshed.
    #[error("authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// An operation was attempted before a successful connect.
    #[error("connector is not connected")]
    NotConnected,

    // Transport errors (usually transient)
    /// Network or HTTP-level failure talking to the target system.
    #[error("transport error during {operation}: {message}")]
    Transport {
        operation: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The request did not complete within the configured timeout.
    #[error("timeout during {operation}")]
    Timeout { operation: String },

    /// Response body did not match the expected schema.
    #[error("failed to decode response for {operation}: {message}")]
    Decode { operation: String, message: String },

    // Provisioning errors (permanent)
    /// An entitlement id could not be parsed back into its parts.
    #[error("invalid entitlement id format: {entitlement_id}")]
    InvalidEntitlementFormat { entitlement_id: String },

    /// The principal of a grant is not a resource type that can hold it.
    #[error("resource type '{resource_type}' cannot hold entitlement {entitlement_id}")]
    InvalidPrincipal {
        resource_type: String,
        entitlement_id: String,
    },

    /// The user could not be resolved in the target system.
    #[error("user not found: {identifier}")]
    UserNotFound { identifier: String },

    /// The group could not be resolved in the target system.
    #[error("group not found: {identifier}")]
    GroupNotFound { identifier: String },

    // Configuration errors (permanent)
    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// A page token handed back by the engine could not be interpreted.
    #[error("invalid page token: {token}")]
    InvalidPageToken { token: String },

    /// A traversal received the same page token twice in a row.
    #[error("pagination did not advance past token {token}")]
    PaginationStalled { token: String },
}

impl ConnectorError {
    /// Check if this error is transient and the operation may be retried
    /// by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::Transport { .. } | ConnectorError::Timeout { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::AuthenticationFailed { .. } => "AUTH_FAILED",
            ConnectorError::NotConnected => "NOT_CONNECTED",
            ConnectorError::Transport { .. } => "TRANSPORT_ERROR",
            ConnectorError::Timeout { .. } => "TIMEOUT",
            ConnectorError::Decode { .. } => "DECODE_ERROR",
            ConnectorError::InvalidEntitlementFormat { .. } => "INVALID_ENTITLEMENT_FORMAT",
            ConnectorError::InvalidPrincipal { .. } => "INVALID_PRINCIPAL",
            ConnectorError::UserNotFound { .. } => "USER_NOT_FOUND",
            ConnectorError::GroupNotFound { .. } => "GROUP_NOT_FOUND",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::InvalidPageToken { .. } => "INVALID_PAGE_TOKEN",
            ConnectorError::PaginationStalled { .. } => "PAGINATION_STALLED",
        }
    }

    // Convenience constructors

    /// Create an authentication failed error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        ConnectorError::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::Transport {
            operation: operation.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error with source.
    pub fn transport_with_source(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Transport {
            operation: operation.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
