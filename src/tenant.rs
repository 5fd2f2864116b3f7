//! Stored tailnet configuration.
//!
//! A backend instance holds exactly one [`TenantConfig`], persisted as JSON
//! under [`CONFIG_KEY`]. Every update replaces the whole object.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AuthPolicy;
use crate::{Error, Result};

/// Storage key of the persisted configuration.
pub const CONFIG_KEY: &str = "config";

/// Upstream endpoint used when `api_url` is not supplied.
pub const DEFAULT_API_URL: &str = "https://api.tailscale.com";

/// OAuth scope requested when `oauth_scopes` is not supplied.
pub const DEFAULT_OAUTH_SCOPE: &str = "devices";

pub(crate) fn default_oauth_scopes() -> Vec<String> {
    vec![DEFAULT_OAUTH_SCOPE.to_string()]
}

/// Credentials and identity of the tailnet keys are issued for.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Tailnet name
    pub tailnet: String,
    /// Static API key; takes precedence over OAuth when non-empty
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the upstream API
    #[serde(default)]
    pub api_url: String,
    /// OAuth client id
    #[serde(default)]
    pub oauth_client_id: String,
    /// OAuth client secret
    #[serde(default)]
    pub oauth_client_secret: String,
    /// OAuth scopes requested during the client-credentials exchange
    #[serde(default = "default_oauth_scopes")]
    pub oauth_scopes: Vec<String>,
}

impl fmt::Debug for TenantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &str) -> &'static str {
            if value.is_empty() { "" } else { "[REDACTED]" }
        }

        f.debug_struct("TenantConfig")
            .field("tailnet", &self.tailnet)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("oauth_client_id", &self.oauth_client_id)
            .field("oauth_client_secret", &redact(&self.oauth_client_secret))
            .field("oauth_scopes", &self.oauth_scopes)
            .finish()
    }
}

impl TenantConfig {
    /// Whether a static API key is present
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Whether both halves of the OAuth client credentials are present
    #[must_use]
    pub fn has_oauth_credentials(&self) -> bool {
        !self.oauth_client_id.is_empty() && !self.oauth_client_secret.is_empty()
    }

    /// Check the update-time invariants, in order: tailnet, authentication,
    /// API URL.
    pub fn validate(&self, policy: AuthPolicy) -> Result<()> {
        if self.tailnet.is_empty() {
            return Err(Error::InvalidConfig(
                "provided tailnet cannot be empty".to_string(),
            ));
        }

        if !self.has_api_key() {
            if !policy.allows_oauth() {
                return Err(Error::InvalidConfig(
                    "provided api_key cannot be empty".to_string(),
                ));
            }
            if !self.has_oauth_credentials() {
                return Err(Error::InvalidConfig(
                    "must either provide a non-empty api_key or a non-empty oauth_client_id and oauth_client_secret"
                        .to_string(),
                ));
            }
        }

        if self.api_url.is_empty() {
            return Err(Error::InvalidConfig(
                "provided api_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
