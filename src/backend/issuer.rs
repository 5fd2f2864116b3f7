//! Key issuance: strategy resolution, capability mapping and the upstream call.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::Backend;
use crate::audit::{self, AuditEvent};
use crate::config::{AuthPolicy, IssuerConfig};
use crate::tenant::TenantConfig;
use crate::upstream::{AuthStrategy, CreateKeyOptions, Key, KeyCapabilities, UpstreamTarget};
use crate::{Error, Result};

/// Lifetime of an issued key when the request does not set one.
pub const DEFAULT_KEY_LIFETIME: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Typed key generation request, as produced by the request router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequest {
    /// Tags applied to the provisioned device, in the order supplied
    pub tags: Vec<String>,
    /// Device skips manual authorization
    pub preauthorized: bool,
    /// Device is removed after inactivity
    pub ephemeral: bool,
    /// Key may provision more than one device
    pub reusable: bool,
    /// Validity window of the key
    pub lifetime: Duration,
}

impl Default for KeyRequest {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            preauthorized: false,
            ephemeral: false,
            reusable: false,
            lifetime: DEFAULT_KEY_LIFETIME,
        }
    }
}

/// Key returned to the caller.
///
/// The capability flags echo what the upstream reports it applied, not
/// what was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedKey {
    /// Key identifier
    pub id: String,
    /// Secret key material
    pub key: String,
    /// Expiry time
    pub expires: DateTime<Utc>,
    /// Applied tags
    pub tags: Vec<String>,
    /// Applied reusable flag
    pub reusable: bool,
    /// Applied ephemeral flag
    pub ephemeral: bool,
    /// Applied preauthorized flag
    pub preauthorized: bool,
}

impl From<Key> for IssuedKey {
    fn from(key: Key) -> Self {
        Self {
            id: key.id,
            key: key.key,
            expires: key.expires,
            tags: key.capabilities.tags,
            reusable: key.capabilities.reusable,
            ephemeral: key.capabilities.ephemeral,
            preauthorized: key.capabilities.preauthorized,
        }
    }
}

/// Pick the authentication strategy for a stored configuration.
///
/// A non-empty API key always wins; OAuth fields are then ignored. A
/// complete OAuth pair is used only if `policy` allows it.
///
/// # Errors
///
/// [`Error::AuthNotConfigured`] when no allowed strategy is fully specified.
pub fn resolve_strategy(config: &TenantConfig, policy: AuthPolicy) -> Result<AuthStrategy> {
    if config.has_api_key() {
        return Ok(AuthStrategy::ApiKey(config.api_key.clone()));
    }

    if policy.allows_oauth() && config.has_oauth_credentials() {
        return Ok(AuthStrategy::OAuth {
            client_id: config.oauth_client_id.clone(),
            client_secret: config.oauth_client_secret.clone(),
            scopes: config.oauth_scopes.clone(),
        });
    }

    Err(Error::AuthNotConfigured)
}

/// Map a request onto upstream capabilities and key options.
///
/// Disabled optional dimensions fall back to the upstream defaults:
/// `reusable` is forced off and no explicit expiry is sent.
#[must_use]
pub fn build_capabilities(
    request: &KeyRequest,
    issuer: &IssuerConfig,
) -> (KeyCapabilities, CreateKeyOptions) {
    let capabilities = KeyCapabilities {
        tags: request.tags.clone(),
        reusable: issuer.reusable && request.reusable,
        ephemeral: request.ephemeral,
        preauthorized: request.preauthorized,
    };

    let options = if issuer.lifetime {
        CreateKeyOptions::with_expiry(request.lifetime)
    } else {
        CreateKeyOptions::default()
    };

    (capabilities, options)
}

/// Where a key generation request stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    LoadConfig,
    ResolveStrategy,
    InvokeUpstream,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Self::LoadConfig => "load_config",
            Self::ResolveStrategy => "resolve_strategy",
            Self::InvokeUpstream => "invoke_upstream",
        }
    }
}

impl Backend {
    /// Issue a new device auth key.
    ///
    /// Reads the stored configuration, resolves the authentication strategy,
    /// and performs a single upstream call. Failures are returned as-is;
    /// nothing is retried.
    pub async fn generate_key(&self, request: &KeyRequest) -> Result<IssuedKey> {
        match self.issue(request).await {
            Ok(issued) => {
                audit::emit(&AuditEvent::key_issued(&issued));
                Ok(issued)
            }
            Err((stage, e)) => {
                audit::emit(&AuditEvent::key_denied(stage.as_str(), e.to_string()));
                Err(e)
            }
        }
    }

    async fn issue(&self, request: &KeyRequest) -> std::result::Result<IssuedKey, (Stage, Error)> {
        let config = self
            .load_config()
            .await
            .map_err(|e| (Stage::LoadConfig, e))?;

        let auth = resolve_strategy(&config, self.issuer.auth_policy)
            .map_err(|e| (Stage::ResolveStrategy, e))?;
        debug!(tailnet = %config.tailnet, strategy = auth.kind(), "Resolved authentication strategy");

        let (capabilities, options) = build_capabilities(request, &self.issuer);

        let client = self
            .connector
            .connect(UpstreamTarget {
                base_url: config.api_url,
                tailnet: config.tailnet,
                auth,
            })
            .map_err(|e| (Stage::InvokeUpstream, e))?;

        let key = client
            .create_key(&capabilities, &options)
            .await
            .map_err(|e| (Stage::InvokeUpstream, e))?;

        Ok(key.into())
    }
}
