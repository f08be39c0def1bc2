//! Error types for the gateway.

use axum::http::StatusCode;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Channel-related errors.
///
/// These never escape a [`Channel::send`](crate::channels::Channel::send) call;
/// the client folds them into a failed `ChannelResult`.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid destination for channel {name}: {reason}")]
    InvalidDestination { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Request-level error, terminal for the request that raised it.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed, missing or empty input.
    #[error("{0}")]
    Validation(String),

    /// Operator-set configuration is missing or invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The post store could not resolve the requested posts.
    #[error("{0}")]
    Lookup(#[from] DatabaseError),

    /// Transport failure or a failure reported by the provider.
    #[error("{message}")]
    Provider { message: String, status: Option<u16> },
}

impl GatewayError {
    /// HTTP status this error is reported with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Lookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Provider { status, .. } => upstream_status(*status),
        }
    }

    /// Caller-facing message. Configuration errors carry the short form only.
    pub fn message(&self) -> String {
        match self {
            Self::Config(ConfigError::MissingRequired { key, .. }) if key == "PUBLISHER_ENDPOINT" => {
                "Publisher URL not set".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Forward the provider's status when it is an error status, else 400.
pub fn upstream_status(status: Option<u16>) -> StatusCode {
    status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|code| code.is_client_error() || code.is_server_error())
        .unwrap_or(StatusCode::BAD_REQUEST)
}
