//! Request field schemas.
//!
//! Raw request data arrives as a JSON object (a request body, or a query
//! string lifted into one). This module is the only place that coerces and
//! defaults those fields; the backend receives fully typed values.
//!
//! Coercion rules:
//!
//! - strings must be JSON strings
//! - string lists accept a JSON array of strings or a comma-separated string
//! - booleans accept JSON booleans or `true`/`false`/`1`/`0`/`t`/`f`
//! - durations accept a whole number of seconds or a duration string
//!
//! Unknown fields are rejected.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::backend::KeyRequest;
use crate::config::IssuerConfig;
use crate::duration::{ensure_min_lifetime, parse_duration};
use crate::tenant::{DEFAULT_API_URL, TenantConfig, default_oauth_scopes};
use crate::{Error, Result};

/// Raw request fields.
pub type Fields = Map<String, Value>;

const CONFIG_FIELDS: &[&str] = &[
    "tailnet",
    "api_key",
    "api_url",
    "oauth_client_id",
    "oauth_client_secret",
    "oauth_scopes",
];

/// Coerce the fields of a configuration update.
///
/// A missing `tailnet` becomes an empty string so validation reports it.
pub fn parse_config_update(fields: &Fields) -> Result<TenantConfig> {
    reject_unknown(fields, CONFIG_FIELDS)?;

    Ok(TenantConfig {
        tailnet: string_field(fields, "tailnet")?.unwrap_or_default(),
        api_key: string_field(fields, "api_key")?.unwrap_or_default(),
        api_url: string_field(fields, "api_url")?.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        oauth_client_id: string_field(fields, "oauth_client_id")?.unwrap_or_default(),
        oauth_client_secret: string_field(fields, "oauth_client_secret")?.unwrap_or_default(),
        oauth_scopes: string_list_field(fields, "oauth_scopes")?
            .unwrap_or_else(default_oauth_scopes),
    })
}

/// Names of the key fields exposed under `issuer`.
#[must_use]
pub fn key_field_names(issuer: &IssuerConfig) -> Vec<&'static str> {
    let mut names = vec!["tags", "preauthorized", "ephemeral"];
    if issuer.reusable {
        names.push("reusable");
    }
    if issuer.lifetime {
        names.push("lifetime");
    }
    names
}

/// Coerce the fields of a key generation request.
///
/// `reusable` and `lifetime` are only part of the schema when enabled in
/// `issuer`.
pub fn parse_key_request(fields: &Fields, issuer: &IssuerConfig) -> Result<KeyRequest> {
    reject_unknown(fields, &key_field_names(issuer))?;

    let lifetime = match duration_field(fields, "lifetime")? {
        Some(value) => ensure_min_lifetime("lifetime", value)?,
        None => issuer.default_lifetime,
    };

    Ok(KeyRequest {
        tags: string_list_field(fields, "tags")?.unwrap_or_default(),
        preauthorized: bool_field(fields, "preauthorized")?.unwrap_or(false),
        ephemeral: bool_field(fields, "ephemeral")?.unwrap_or(false),
        reusable: bool_field(fields, "reusable")?.unwrap_or(false),
        lifetime,
    })
}

fn reject_unknown(fields: &Fields, allowed: &[&str]) -> Result<()> {
    let mut unknown: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|name| !allowed.contains(name))
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(Error::RequestSchema(format!(
        "unknown field(s): {}",
        unknown.join(", ")
    )))
}

fn present<'a>(fields: &'a Fields, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

fn type_error(name: &str, expected: &str, value: &Value) -> Error {
    Error::RequestSchema(format!("field '{name}': expected {expected}, got {value}"))
}

fn string_field(fields: &Fields, name: &str) -> Result<Option<String>> {
    match present(fields, name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(type_error(name, "a string", other)),
    }
}

fn string_list_field(fields: &Fields, name: &str) -> Result<Option<Vec<String>>> {
    let Some(value) = present(fields, name) else {
        return Ok(None);
    };

    let items: Vec<String> = match value {
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(values) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.clone()),
                other => Err(type_error(name, "a list of strings", other)),
            })
            .collect::<Result<_>>()?,
        other => return Err(type_error(name, "a list of strings", other)),
    };

    Ok(Some(
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    ))
}

fn bool_field(fields: &Fields, name: &str) -> Result<Option<bool>> {
    match present(fields, name) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(Some(true)),
            "false" | "f" | "0" => Ok(Some(false)),
            _ => Err(type_error(name, "a boolean", &Value::String(s.clone()))),
        },
        Some(other) => Err(type_error(name, "a boolean", other)),
    }
}

fn duration_field(fields: &Fields, name: &str) -> Result<Option<Duration>> {
    match present(fields, name) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|secs| Some(Duration::from_secs(secs)))
            .ok_or_else(|| type_error(name, "a whole number of seconds", &Value::Number(n.clone()))),
        Some(Value::String(s)) => parse_duration(s)
            .map(Some)
            .map_err(|e| Error::RequestSchema(format!("field '{name}': {e}"))),
        Some(other) => Err(type_error(name, "a duration", other)),
    }
}
