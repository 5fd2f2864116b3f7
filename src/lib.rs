//! Tailscale Key Backend Library
//!
//! Secret backend that issues Tailscale device authentication keys.
//!
//! # Features
//!
//! - **Configuration**: validated, whole-object storage of the tailnet name,
//!   upstream URL and credentials
//! - **Two auth strategies**: static API key, or OAuth client credentials
//!   with configurable scopes; a non-empty API key always takes precedence
//! - **Key issuance**: tags, ephemeral, preauthorized, and (when enabled)
//!   reusable and lifetime, echoed back as applied by the upstream
//! - **Pluggable collaborators**: config store and upstream client are
//!   injected traits, so several independent backends can coexist

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod backend;
pub mod cli;
pub mod config;
pub mod duration;
pub mod error;
pub mod fields;
pub mod router;
pub mod server;
pub mod store;
pub mod tenant;
pub mod upstream;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Build version reported at startup and by `/health`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to initialize logging: {e}"))),
        _ => subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to initialize logging: {e}"))),
    }
}
