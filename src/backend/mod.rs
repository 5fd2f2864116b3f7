//! The key backend — configuration management and key issuance.
//!
//! A [`Backend`] is an explicitly constructed service object. It owns no
//! request state: every call reads the stored configuration afresh, so any
//! number of instances can share (or not share) a store.
//!
//! # Request flow
//!
//! ```text
//! config read   -> load stored entry -> decode -> snapshot
//! config update -> validate (tailnet, auth, api_url) -> overwrite entry
//! key generate  -> load stored entry -> resolve auth strategy
//!               -> build capabilities -> upstream create_key -> IssuedKey
//! ```

mod configuration;
mod issuer;

use std::sync::Arc;

use crate::config::IssuerConfig;
use crate::store::ConfigStore;
use crate::tenant::{CONFIG_KEY, TenantConfig};
use crate::upstream::UpstreamConnector;
use crate::{Error, Result};

pub use issuer::{
    DEFAULT_KEY_LIFETIME, IssuedKey, KeyRequest, build_capabilities, resolve_strategy,
};

/// Secret backend issuing device auth keys for one tailnet.
pub struct Backend {
    store: Arc<dyn ConfigStore>,
    connector: Arc<dyn UpstreamConnector>,
    issuer: IssuerConfig,
}

impl Backend {
    /// Create a backend from its collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn ConfigStore>,
        connector: Arc<dyn UpstreamConnector>,
        issuer: IssuerConfig,
    ) -> Self {
        Self {
            store,
            connector,
            issuer,
        }
    }

    /// Issuer settings this backend was built with.
    #[must_use]
    pub fn issuer_config(&self) -> &IssuerConfig {
        &self.issuer
    }

    /// Read and decode the stored configuration.
    async fn load_config(&self) -> Result<TenantConfig> {
        let bytes = self
            .store
            .get(CONFIG_KEY)
            .await?
            .ok_or(Error::NotConfigured)?;
        serde_json::from_slice(&bytes).map_err(Error::Decode)
    }
}
