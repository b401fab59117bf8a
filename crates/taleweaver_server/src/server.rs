//! Application assembly and the HTTP server loop.

use crate::api::{ApiState, create_router};
use crate::config::TaleweaverConfig;
use crate::orchestrator::Orchestrator;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use taleweaver_error::{ServerError, ServerErrorKind, TaleweaverResult};
use taleweaver_models::OllamaClient;
use taleweaver_storage::FileSystemStoryStore;
use tokio::net::TcpListener;
use tracing::{info, instrument};

/// A configured Taleweaver web server.
#[derive(Debug, Clone)]
pub struct StoryServer {
    config: TaleweaverConfig,
    orchestrator: Arc<Orchestrator>,
}

impl StoryServer {
    /// Wire the Ollama client and the story store together.
    ///
    /// Creates the output directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the output
    /// directory cannot be created.
    #[instrument(skip(config))]
    pub fn from_config(config: TaleweaverConfig) -> TaleweaverResult<Self> {
        config.validate()?;
        let driver = OllamaClient::new(config.ollama.clone())?;
        let store = FileSystemStoryStore::new(&config.storage.output_dir)?;
        let orchestrator = Orchestrator::new(
            Arc::new(driver),
            Arc::new(store),
            Arc::new(config.catalog()),
            config.ollama.default_model().clone(),
        )
        .with_limits(config.token_limits()?)
        .with_estimator(config.generation.estimator)
        .with_sampling(config.ollama.sampling(config.generation.default_tokens));

        Ok(Self::with_orchestrator(config, Arc::new(orchestrator)))
    }

    /// Build a server around an existing orchestrator.
    pub fn with_orchestrator(config: TaleweaverConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// The orchestrator behind the routes.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// The application router.
    pub fn router(&self) -> Router {
        create_router(ApiState::new(self.orchestrator.clone()))
    }

    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(&self) -> TaleweaverResult<TcpListener> {
        let address = self.config.server.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ServerError::new(ServerErrorKind::Bind(format!("{}: {}", address, e))))?;
        Ok(listener)
    }

    /// Serve on the configured address until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if binding or serving fails.
    pub async fn serve(self) -> TaleweaverResult<()> {
        let listener = self.bind().await?;
        self.serve_with_shutdown(listener, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
    }

    /// Serve on `listener` until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the server loop fails.
    #[instrument(skip(self, listener, shutdown))]
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> TaleweaverResult<()> {
        let address = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        info!(
            address = %address,
            ollama = %self.config.ollama.base_url(),
            output_dir = %self.config.storage.output_dir.display(),
            "Taleweaver listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::new(ServerErrorKind::Serve(e.to_string())))?;

        info!("Server stopped");
        Ok(())
    }
}
