//! Upstream device-management API.
//!
//! The key issuer talks to the upstream through two seams:
//!
//! - [`UpstreamConnector`] builds a client for one request from the stored
//!   base URL, tailnet and resolved [`AuthStrategy`].
//! - [`UpstreamApi`] performs the single `create_key` round trip.
//!
//! [`HttpConnector`] is the production implementation; tests substitute
//! their own connector to observe what the issuer sends.

mod client;
mod oauth;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

pub use client::{HttpConnector, TailscaleClient};
pub use oauth::{OAuthToken, fetch_client_credentials_token};

/// How requests to the upstream API are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// Static API key, sent as HTTP basic auth username
    ApiKey(String),
    /// OAuth client credentials, exchanged for a bearer token per request
    OAuth {
        /// OAuth client id
        client_id: String,
        /// OAuth client secret
        client_secret: String,
        /// Scopes requested in the exchange
        scopes: Vec<String>,
    },
}

impl AuthStrategy {
    /// Short name used in logs and audit events
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ApiKey(_) => "api_key",
            Self::OAuth { .. } => "oauth",
        }
    }
}

impl fmt::Debug for AuthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey([REDACTED])"),
            Self::OAuth {
                client_id, scopes, ..
            } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .field("scopes", scopes)
                .finish(),
        }
    }
}

/// Everything needed to reach the upstream for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Base URL of the upstream API
    pub base_url: String,
    /// Tailnet the key is created in
    pub tailnet: String,
    /// Resolved authentication strategy
    pub auth: AuthStrategy,
}

/// Capability flags attached to a device auth key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCapabilities {
    /// Tags applied to devices provisioned with the key
    #[serde(default)]
    pub tags: Vec<String>,
    /// Key may provision more than one device
    #[serde(default)]
    pub reusable: bool,
    /// Devices are removed after inactivity
    #[serde(default)]
    pub ephemeral: bool,
    /// Devices skip manual authorization
    #[serde(default)]
    pub preauthorized: bool,
}

/// Options sent alongside the capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateKeyOptions {
    /// Explicit key expiry; `None` leaves the upstream default in place
    pub expiry: Option<Duration>,
}

impl CreateKeyOptions {
    /// Options carrying an explicit expiry
    #[must_use]
    pub fn with_expiry(expiry: Duration) -> Self {
        Self {
            expiry: Some(expiry),
        }
    }
}

/// A key as returned by the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Key identifier
    pub id: String,
    /// Secret key material
    pub key: String,
    /// Creation time, when reported
    pub created: Option<DateTime<Utc>>,
    /// Expiry time
    pub expires: DateTime<Utc>,
    /// Capabilities the upstream actually applied
    pub capabilities: KeyCapabilities,
}

/// The upstream key-creation API.
#[async_trait::async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Create a key with the given capabilities.
    async fn create_key(
        &self,
        capabilities: &KeyCapabilities,
        options: &CreateKeyOptions,
    ) -> Result<Key>;
}

/// Factory producing an [`UpstreamApi`] client for a target.
pub trait UpstreamConnector: Send + Sync + 'static {
    /// Build a client for `target`.
    fn connect(&self, target: UpstreamTarget) -> Result<Box<dyn UpstreamApi>>;
}
