//! HTTP client for the Tailscale v2 API.

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::oauth::fetch_client_credentials_token;
use super::{
    AuthStrategy, CreateKeyOptions, Key, KeyCapabilities, UpstreamApi, UpstreamConnector,
    UpstreamTarget,
};
use crate::config::UpstreamConfig;
use crate::{Error, Result};

/// Connector that builds [`TailscaleClient`]s sharing one HTTP client.
#[derive(Clone)]
pub struct HttpConnector {
    http: Client,
}

impl HttpConnector {
    /// Build a connector from the upstream configuration
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http })
    }

    /// Wrap an existing HTTP client
    #[must_use]
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

impl UpstreamConnector for HttpConnector {
    fn connect(&self, target: UpstreamTarget) -> Result<Box<dyn UpstreamApi>> {
        Ok(Box::new(TailscaleClient::new(self.http.clone(), target)?))
    }
}

/// Client bound to one tailnet and one authentication strategy.
pub struct TailscaleClient {
    http: Client,
    base_url: Url,
    tailnet: String,
    auth: AuthStrategy,
}

impl TailscaleClient {
    /// Create a client for `target`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] if the base URL cannot be parsed.
    pub fn new(http: Client, target: UpstreamTarget) -> Result<Self> {
        let base_url = Url::parse(&target.base_url)
            .map_err(|e| Error::upstream(None, format!("invalid API URL '{}': {e}", target.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::upstream(
                None,
                format!("invalid API URL '{}'", target.base_url),
            ));
        }

        Ok(Self {
            http,
            base_url,
            tailnet: target.tailnet,
            auth: target.auth,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::upstream(None, format!("invalid API URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match &self.auth {
            AuthStrategy::ApiKey(key) => Ok(request.basic_auth(key, None::<&str>)),
            AuthStrategy::OAuth {
                client_id,
                client_secret,
                scopes,
            } => {
                let token_url = self.endpoint(&["api", "v2", "oauth", "token"])?;
                let token = fetch_client_credentials_token(
                    &self.http,
                    &token_url,
                    client_id,
                    client_secret,
                    scopes,
                )
                .await?;
                Ok(request.bearer_auth(token.access_token))
            }
        }
    }
}

#[async_trait::async_trait]
impl UpstreamApi for TailscaleClient {
    async fn create_key(
        &self,
        capabilities: &KeyCapabilities,
        options: &CreateKeyOptions,
    ) -> Result<Key> {
        let url = self.endpoint(&["api", "v2", "tailnet", &self.tailnet, "keys"])?;
        let body = CreateKeyRequest {
            capabilities: WireCapabilities::from(capabilities),
            expiry_seconds: options.expiry.map(|d| d.as_secs()),
        };

        debug!(
            tailnet = %self.tailnet,
            strategy = self.auth.kind(),
            expiry_seconds = ?body.expiry_seconds,
            "Creating key"
        );

        let request = self.authorize(self.http.post(url).json(&body)).await?;
        let response = request
            .send()
            .await
            .map_err(|e| Error::upstream(None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = failure_message(response.text().await);
            return Err(Error::upstream(Some(status.as_u16()), message));
        }

        let key: KeyResponse = response.json().await.map_err(|e| {
            Error::upstream(
                Some(status.as_u16()),
                format!("Failed to parse key response: {e}"),
            )
        })?;

        Ok(key.into())
    }
}

/// Pull the human-readable message out of an upstream error body.
///
/// The API answers with `{"message": ...}`; OAuth failures use
/// `error_description`/`error`. Anything else is returned as-is.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error_description: Option<String>,
        error: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error_description).or(b.error))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Message for a non-2xx response, given the attempt to read its body.
pub(super) fn failure_message<E: std::fmt::Display>(
    body: std::result::Result<String, E>,
) -> String {
    match body {
        Ok(body) => error_message(&body),
        Err(e) => format!("failed to read error response body: {e}"),
    }
}

// ── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateKeyRequest {
    capabilities: WireCapabilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiry_seconds: Option<u64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireCapabilities {
    #[serde(default)]
    devices: WireDevices,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireDevices {
    #[serde(default)]
    create: KeyCapabilities,
}

impl From<&KeyCapabilities> for WireCapabilities {
    fn from(capabilities: &KeyCapabilities) -> Self {
        Self {
            devices: WireDevices {
                create: capabilities.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeyResponse {
    id: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    expires: DateTime<Utc>,
    #[serde(default)]
    capabilities: WireCapabilities,
}

impl From<KeyResponse> for Key {
    fn from(response: KeyResponse) -> Self {
        Self {
            id: response.id,
            key: response.key,
            created: response.created,
            expires: response.expires,
            capabilities: response.capabilities.devices.create,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> TailscaleClient {
        TailscaleClient::new(
            Client::new(),
            UpstreamTarget {
                base_url: base_url.to_string(),
                tailnet: "example.com".to_string(),
                auth: AuthStrategy::ApiKey("tskey-api".to_string()),
            },
        )
        .unwrap()
    }

    #[test]
    fn endpoint_appends_segments() {
        let url = client("https://api.tailscale.com")
            .endpoint(&["api", "v2", "tailnet", "example.com", "keys"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.tailscale.com/api/v2/tailnet/example.com/keys"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_and_escapes_tailnet() {
        let url = client("http://localhost:8080/proxy/")
            .endpoint(&["api", "v2", "tailnet", "me@example.com", "keys"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/proxy/api/v2/tailnet/me@example.com/keys"
        );
    }

    #[test]
    fn invalid_base_url_is_upstream_error() {
        let err = TailscaleClient::new(
            Client::new(),
            UpstreamTarget {
                base_url: "not a url".to_string(),
                tailnet: "t".to_string(),
                auth: AuthStrategy::ApiKey("k".to_string()),
            },
        )
        .err()
        .unwrap();
        assert!(matches!(err, Error::Upstream { status: None, .. }));
    }

    #[test]
    fn request_body_nests_capabilities() {
        let body = CreateKeyRequest {
            capabilities: WireCapabilities::from(&KeyCapabilities {
                tags: vec!["tag:server".to_string()],
                reusable: false,
                ephemeral: true,
                preauthorized: false,
            }),
            expiry_seconds: Some(3600),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "capabilities": {"devices": {"create": {
                    "tags": ["tag:server"],
                    "reusable": false,
                    "ephemeral": true,
                    "preauthorized": false
                }}},
                "expirySeconds": 3600
            })
        );
    }

    #[test]
    fn request_body_omits_expiry_when_unset() {
        let body = CreateKeyRequest {
            capabilities: WireCapabilities::default(),
            expiry_seconds: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("expirySeconds").is_none());
    }

    #[test]
    fn error_message_prefers_message_field() {
        assert_eq!(
            error_message(r#"{"message":"API token invalid"}"#),
            "API token invalid"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_client","error_description":"bad secret"}"#),
            "bad secret"
        );
        assert_eq!(error_message("  gateway timeout \n"), "gateway timeout");
    }

    #[test]
    fn unreadable_error_body_keeps_the_read_failure() {
        let message = failure_message::<&str>(Err("connection reset by peer"));
        assert_eq!(
            message,
            "failed to read error response body: connection reset by peer"
        );
        assert_eq!(
            failure_message::<&str>(Ok(r#"{"message":"quota exceeded"}"#.to_string())),
            "quota exceeded"
        );
    }
}
