//! HTTP surface.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and build version |
//! | `GET` | `/v1/{mount}/config` | Read the stored configuration |
//! | `POST`/`PUT` | `/v1/{mount}/config` | Replace the stored configuration |
//! | `GET` | `/v1/{mount}/key` | Generate a key from query-string fields |
//! | `POST` | `/v1/{mount}/key` | Generate a key from a JSON body |
//!
//! Successful reads answer `{"data": {...}}`; errors answer
//! `{"errors": ["<message>"]}` with a status derived from the error kind.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::debug;

use crate::Error;
use crate::backend::Backend;
use crate::fields::{self, Fields};

/// Build the router for a backend mounted at `/v1/{mount}`.
pub fn create_router(backend: Arc<Backend>, mount: &str) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            &format!("/v1/{mount}/config"),
            get(read_config_handler)
                .post(update_config_handler)
                .put(update_config_handler),
        )
        .route(
            &format!("/v1/{mount}/key"),
            get(generate_key_query_handler).post(generate_key_body_handler),
        )
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(backend)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            debug!(error = %self, "Request rejected");
        }
        (status, Json(json!({"errors": [self.to_string()]}))).into_response()
    }
}

/// `GET /health`
async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "ok", "version": crate::VERSION}))
}

/// `GET /v1/{mount}/config`
async fn read_config_handler(State(backend): State<Arc<Backend>>) -> Result<Response, Error> {
    let config = backend.read_configuration().await?;
    Ok(Json(json!({"data": config})).into_response())
}

/// `POST|PUT /v1/{mount}/config`
async fn update_config_handler(
    State(backend): State<Arc<Backend>>,
    body: Bytes,
) -> Result<Response, Error> {
    let fields = body_fields(&body)?;
    let config = fields::parse_config_update(&fields)?;
    backend.update_configuration(config).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// `GET /v1/{mount}/key?tags=...&ephemeral=...`
async fn generate_key_query_handler(
    State(backend): State<Arc<Backend>>,
    RawQuery(query): RawQuery,
) -> Result<Response, Error> {
    let fields = query_fields(query.as_deref().unwrap_or_default());
    generate_key(&backend, &fields).await
}

/// `POST /v1/{mount}/key`
async fn generate_key_body_handler(
    State(backend): State<Arc<Backend>>,
    body: Bytes,
) -> Result<Response, Error> {
    let fields = body_fields(&body)?;
    generate_key(&backend, &fields).await
}

async fn generate_key(backend: &Backend, fields: &Fields) -> Result<Response, Error> {
    let request = fields::parse_key_request(fields, backend.issuer_config())?;
    let issued = backend.generate_key(&request).await?;
    Ok(Json(json!({"data": issued})).into_response())
}

/// Parse a JSON object body. An empty body is an empty field set.
fn body_fields(body: &[u8]) -> Result<Fields, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Fields::new());
    }
    match serde_json::from_slice(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::RequestSchema(format!(
            "request body must be a JSON object, got {other}"
        ))),
        Err(e) => Err(Error::RequestSchema(format!("invalid JSON body: {e}"))),
    }
}

/// Lift a query string into fields. A repeated key becomes a list.
fn query_fields(query: &str) -> Fields {
    let mut fields = Fields::new();
    for (name, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match fields.get_mut(name.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                fields.insert(name.into_owned(), value);
            }
        }
    }
    fields
}
