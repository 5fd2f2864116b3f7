//! Audit logging for configuration changes and key issuance.
//!
//! Every event is emitted via `tracing` with the event serialized as JSON in
//! the `audit` field. Credentials and key material never appear in events.
//!
//! # Events
//!
//! | Event | When |
//! |-------|------|
//! | `config.updated` | A configuration update passed validation and was stored |
//! | `config.rejected` | A configuration update failed validation |
//! | `key.issued` | The upstream created a key |
//! | `key.denied` | Key generation failed at some stage |

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::IssuedKey;
use crate::tenant::TenantConfig;

/// Structured audit event.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Event type string (e.g., `"key.issued"`).
    pub event: &'static str,
    /// Tailnet the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tailnet: Option<String>,
    /// Configured authentication strategies (for `config.updated`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategies: Option<Vec<&'static str>>,
    /// Issued key id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    /// Applied tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Applied reusable flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reusable: Option<bool>,
    /// Applied ephemeral flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral: Option<bool>,
    /// Applied preauthorized flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preauthorized: Option<bool>,
    /// Key expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    /// Processing stage that failed (for `key.denied`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'static str>,
    /// Human-readable reason for rejection events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    fn new(event: &'static str) -> Self {
        Self {
            event,
            tailnet: None,
            strategies: None,
            key_id: None,
            tags: None,
            reusable: None,
            ephemeral: None,
            preauthorized: None,
            expires: None,
            stage: None,
            reason: None,
        }
    }

    /// Construct a `config.updated` event.
    #[must_use]
    pub fn config_updated(config: &TenantConfig) -> Self {
        let mut strategies = Vec::new();
        if config.has_api_key() {
            strategies.push("api_key");
        }
        if config.has_oauth_credentials() {
            strategies.push("oauth");
        }

        Self {
            tailnet: Some(config.tailnet.clone()),
            strategies: Some(strategies),
            ..Self::new("config.updated")
        }
    }

    /// Construct a `config.rejected` event.
    #[must_use]
    pub fn config_rejected(tailnet: &str, reason: impl Into<String>) -> Self {
        Self {
            tailnet: (!tailnet.is_empty()).then(|| tailnet.to_string()),
            reason: Some(reason.into()),
            ..Self::new("config.rejected")
        }
    }

    /// Construct a `key.issued` event.
    #[must_use]
    pub fn key_issued(key: &IssuedKey) -> Self {
        Self {
            key_id: Some(key.id.clone()),
            tags: Some(key.tags.clone()),
            reusable: Some(key.reusable),
            ephemeral: Some(key.ephemeral),
            preauthorized: Some(key.preauthorized),
            expires: Some(key.expires),
            ..Self::new("key.issued")
        }
    }

    /// Construct a `key.denied` event.
    #[must_use]
    pub fn key_denied(stage: &'static str, reason: impl Into<String>) -> Self {
        Self {
            stage: Some(stage),
            reason: Some(reason.into()),
            ..Self::new("key.denied")
        }
    }

    fn is_failure(&self) -> bool {
        self.reason.is_some()
    }
}

/// Emit an audit event via `tracing`.
///
/// Successful events log at `INFO`, rejections at `WARN`:
///
/// ```text
/// INFO tailscale_key_backend::audit audit={"event":"key.issued","key_id":...}
/// ```
pub fn emit(event: &AuditEvent) {
    match serde_json::to_string(event) {
        Ok(ref json) if event.is_failure() => tracing::warn!(audit = %json, "key backend audit"),
        Ok(ref json) => tracing::info!(audit = %json, "key backend audit"),
        Err(ref e) => tracing::warn!(error = %e, "Failed to serialize audit event"),
    }
}
