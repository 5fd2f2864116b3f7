//! Service configuration

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Config store configuration
    pub storage: StorageConfig,
    /// Upstream API client configuration
    pub upstream: UpstreamConfig,
    /// Key issuer configuration
    pub issuer: IssuerConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Mount name; endpoints are served under `/v1/{mount}/`
    pub mount: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8200,
            mount: "tailscale".to_string(),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address: {e}")))
    }
}

/// Which config store implementation to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process memory; lost on restart
    #[default]
    Memory,
    /// JSON files in `storage.path`
    File,
}

/// Config store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend
    pub backend: StorageBackend,
    /// Directory for the file backend
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data"),
        }
    }
}

/// Upstream API client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Per-request timeout for upstream calls
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// User agent sent to the upstream API
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("tailscale-key-backend/{}", crate::VERSION),
        }
    }
}

/// Which authentication strategies a stored configuration may use.
///
/// The same policy drives update-time validation and generate-time
/// strategy resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPolicy {
    /// Only a static API key is accepted
    ApiKeyOnly,
    /// A static API key, or a complete OAuth client-credentials pair
    #[default]
    ApiKeyOrOauth,
}

impl AuthPolicy {
    /// Whether OAuth client credentials are an acceptable strategy
    #[must_use]
    pub fn allows_oauth(self) -> bool {
        matches!(self, Self::ApiKeyOrOauth)
    }
}

/// Key issuer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuerConfig {
    /// Authentication strategy policy
    pub auth_policy: AuthPolicy,
    /// Expose the `reusable` key field
    pub reusable: bool,
    /// Expose the `lifetime` key field and send an explicit key expiry
    pub lifetime: bool,
    /// Lifetime used when a request does not supply one
    #[serde(with = "humantime_serde")]
    pub default_lifetime: Duration,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            auth_policy: AuthPolicy::default(),
            reusable: true,
            lifetime: true,
            default_lifetime: crate::backend::DEFAULT_KEY_LIFETIME,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("TSKB_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.mount.is_empty() || self.server.mount.contains('/') {
            return Err(Error::Config(format!(
                "server.mount must be a single non-empty path segment, got '{}'",
                self.server.mount
            )));
        }
        if self.issuer.default_lifetime < crate::duration::MIN_LIFETIME {
            return Err(Error::Config(
                "issuer.default_lifetime must be at least 1s".to_string(),
            ));
        }
        Ok(())
    }
}
