//! HTTP server wiring

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::config::{Config, StorageBackend};
use crate::router::create_router;
use crate::store::{ConfigStore, FileConfigStore, InMemoryConfigStore};
use crate::upstream::HttpConnector;
use crate::Result;

/// Build a backend from the service configuration.
pub fn build_backend(config: &Config) -> Result<Backend> {
    let store: Arc<dyn ConfigStore> = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory storage; configuration is lost on restart");
            Arc::new(InMemoryConfigStore::new())
        }
        StorageBackend::File => Arc::new(FileConfigStore::open(config.storage.path.clone())?),
    };
    let connector = Arc::new(HttpConnector::new(&config.upstream)?);

    Ok(Backend::new(store, connector, config.issuer.clone()))
}

/// Serve the backend until Ctrl+C or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    let backend = Arc::new(build_backend(&config)?);
    let app = create_router(backend, &config.server.mount);

    let addr = config.server.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!(
        version = crate::VERSION,
        %addr,
        mount = %config.server.mount,
        storage = ?config.storage.backend,
        auth_policy = ?config.issuer.auth_policy,
        "Key backend listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Key backend stopped");
    Ok(())
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
