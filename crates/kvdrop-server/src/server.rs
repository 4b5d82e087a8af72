use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use kvdrop_store::{BlobStore, CollisionPolicy, InMemoryBlobStore};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;
use crate::service::BlobService;

/// kvdrop HTTP server.
pub struct KvdropServer {
    config: ServerConfig,
    store: Arc<dyn BlobStore>,
}

impl KvdropServer {
    pub fn new(config: ServerConfig, store: Arc<dyn BlobStore>) -> Self {
        Self { config, store }
    }

    /// Server backed by a process-local [`InMemoryBlobStore`].
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::new(config, Arc::new(InMemoryBlobStore::new()))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> ServerResult<axum::Router> {
        self.config.validate()?;
        let service = Arc::new(BlobService::from_config(Arc::clone(&self.store), &self.config));
        let state = AppState::new(service, &self.config)?;
        Ok(build_router(state))
    }

    /// Serve requests until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router()?;
        if self.config.collision_policy == CollisionPolicy::Overwrite {
            warn!("collision_policy = overwrite: colliding blobs replace earlier ones");
        }
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            addr = %self.config.bind_addr,
            policy = %self.config.collision_policy,
            compress = self.config.storage.compress,
            cache = self.config.cache.enabled,
            "kvdrop server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
