//! Reading and replacing the stored configuration.

use tracing::debug;

use super::Backend;
use crate::audit::{self, AuditEvent};
use crate::tenant::{CONFIG_KEY, TenantConfig};
use crate::{Error, Result};

impl Backend {
    /// Return the stored configuration, secrets included.
    ///
    /// # Errors
    ///
    /// [`Error::NotConfigured`] if nothing has been stored yet,
    /// [`Error::Decode`] if the stored entry is not a valid configuration.
    pub async fn read_configuration(&self) -> Result<TenantConfig> {
        self.load_config().await
    }

    /// Validate `config` and replace the stored configuration with it.
    ///
    /// Nothing is written unless validation passes.
    pub async fn update_configuration(&self, config: TenantConfig) -> Result<()> {
        if let Err(e) = config.validate(self.issuer.auth_policy) {
            audit::emit(&AuditEvent::config_rejected(&config.tailnet, e.to_string()));
            return Err(e);
        }

        let bytes = serde_json::to_vec(&config)
            .map_err(|e| Error::Storage(format!("Failed to serialize configuration: {e}")))?;
        self.store.put(CONFIG_KEY, bytes).await?;

        debug!(tailnet = %config.tailnet, "Stored configuration");
        audit::emit(&AuditEvent::config_updated(&config));
        Ok(())
    }
}
