use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::chain::DevnetChain;
use crate::config::DevnetConfig;
use crate::error::{DevnetError, DevnetResult};
use crate::handler::AppState;
use crate::router::build_router;

/// Local validator stand-in.
pub struct DevnetServer {
    config: DevnetConfig,
    chain: Arc<DevnetChain>,
}

impl DevnetServer {
    pub fn new(config: DevnetConfig) -> Self {
        Self::with_chain(config, Arc::new(DevnetChain::new()))
    }

    pub fn with_chain(config: DevnetConfig, chain: Arc<DevnetChain>) -> Self {
        Self { config, chain }
    }

    pub fn config(&self) -> &DevnetConfig {
        &self.config
    }

    pub fn chain(&self) -> &Arc<DevnetChain> {
        &self.chain
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState {
            chain: Arc::clone(&self.chain),
            config: Arc::new(self.config.clone()),
        })
    }

    /// Start serving requests.
    pub async fn serve(self) -> DevnetResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("devnet listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .await
            .map_err(|e| DevnetError::Internal(e.to_string()))
    }

    /// Bind now and serve on a background task.
    pub async fn spawn(self) -> DevnetResult<RunningDevnet> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("devnet listening on {local_addr}");
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::warn!(error = %err, "devnet stopped");
            }
        });
        Ok(RunningDevnet {
            local_addr,
            chain: self.chain,
            task,
        })
    }
}

/// Handle to a devnet serving in the background; aborts it on drop.
pub struct RunningDevnet {
    local_addr: SocketAddr,
    chain: Arc<DevnetChain>,
    task: JoinHandle<()>,
}

impl RunningDevnet {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    pub fn chain(&self) -> &Arc<DevnetChain> {
        &self.chain
    }
}

impl Drop for RunningDevnet {
    fn drop(&mut self) {
        self.task.abort();
    }
}
