//! OAuth client-credentials exchange against the upstream token endpoint.

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{Error, Result};

/// Access token returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthToken {
    /// Bearer token for subsequent API calls
    pub access_token: String,
    /// Token type (usually "Bearer")
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Granted scopes
    #[serde(default)]
    pub scope: Option<String>,
}

/// Exchange client credentials for an access token.
///
/// Scopes are sent space-separated, as the token endpoint expects. No token
/// is cached; each call performs a fresh exchange.
pub async fn fetch_client_credentials_token(
    http: &Client,
    token_url: &Url,
    client_id: &str,
    client_secret: &str,
    scopes: &[String],
) -> Result<OAuthToken> {
    let scope = scopes.join(" ");
    let mut params = vec![
        ("grant_type", "client_credentials"),
        ("client_id", client_id),
        ("client_secret", client_secret),
    ];
    if !scope.is_empty() {
        params.push(("scope", scope.as_str()));
    }

    let response = http
        .post(token_url.clone())
        .form(&params)
        .send()
        .await
        .map_err(|e| Error::upstream(None, format!("OAuth token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let message = super::client::failure_message(response.text().await);
        return Err(Error::upstream(Some(status.as_u16()), message));
    }

    let token: OAuthToken = response.json().await.map_err(|e| {
        Error::upstream(
            Some(status.as_u16()),
            format!("Failed to parse OAuth token response: {e}"),
        )
    })?;

    debug!(
        client_id = %client_id,
        expires_in = ?token.expires_in,
        "Obtained OAuth access token"
    );
    Ok(token)
}
