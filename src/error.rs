//! Error types for the key backend

use std::io;

use thiserror::Error;

/// Result type alias for the key backend
pub type Result<T> = std::result::Result<T, Error>;

/// Key backend errors
#[derive(Error, Debug)]
pub enum Error {
    /// No configuration has been written yet
    #[error("configuration has not been set")]
    NotConfigured,

    /// Stored configuration bytes could not be decoded
    #[error("failed to decode stored configuration: {0}")]
    Decode(#[source] serde_json::Error),

    /// Configuration update rejected by validation
    #[error("{0}")]
    InvalidConfig(String),

    /// Stored configuration has no usable authentication strategy
    #[error(
        "no usable authentication configured: set a non-empty api_key or both oauth_client_id and oauth_client_secret"
    )]
    AuthNotConfigured,

    /// Upstream API call failed
    #[error("{}", upstream_message(.status, .message))]
    Upstream {
        /// HTTP status returned by the upstream, if a response was received
        status: Option<u16>,
        /// Message returned by the upstream, unmodified
        message: String,
    },

    /// Request fields failed type coercion or schema checks
    #[error("{0}")]
    RequestSchema(String),

    /// Config store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Service configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP client construction error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

fn upstream_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("upstream API error (HTTP {code}): {message}"),
        None => format!("upstream API error: {message}"),
    }
}

impl Error {
    /// Create an upstream error from a status and message
    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code used when surfacing this error to a caller
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidConfig(_) | Self::RequestSchema(_) => 400,
            Self::NotConfigured => 404,
            Self::AuthNotConfigured => 412,
            Self::Upstream { .. } => 502,
            _ => 500,
        }
    }
}
