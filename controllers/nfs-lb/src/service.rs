//! Process-level wiring.
//!
//! Builds the Kubernetes clients, starts the node watcher, constructs the
//! [`LbController`] and keeps everything alive until shutdown.

use crate::config::LbConfig;
use crate::controller::LbController;
use crate::error::ControllerError;
use crate::watcher::NodeSnapshotCache;
use kube::Client;
use node_client::{NodeClient, NodeClientTrait};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Running NFS LB Controller
pub struct Service {
    controller: Arc<LbController>,
    node_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl Service {
    /// Connects to the cluster and returns once the controller is ready.
    pub async fn new(config: &LbConfig) -> Result<Self, ControllerError> {
        info!("Initializing NFS LB Controller");

        let kube_client = Client::try_default().await?;
        let node_client = NodeClient::new(kube_client.clone());

        // Fail fast on missing RBAC instead of waiting forever for a cache sync
        info!("Validating node access...");
        let nodes = node_client.list_nodes().await.map_err(|e| {
            error!("Failed to list nodes: {}", e);
            error!("Please ensure the service account can get, list, watch and update nodes");
            ControllerError::NodeClient(e)
        })?;
        info!("Node access validated, {} nodes in cluster", nodes.len());

        let (cache, node_watcher) = NodeSnapshotCache::spawn(kube_client);

        let controller = LbController::new(
            config.ip_addresses.clone(),
            Arc::new(node_client),
            cache,
            config.controller_options(),
        )
        .await?;

        Ok(Self {
            controller: Arc::new(controller),
            node_watcher,
        })
    }

    /// Shared handle for the storage driver.
    pub fn controller(&self) -> Arc<LbController> {
        self.controller.clone()
    }

    /// Runs until the node watcher exits or a shutdown signal arrives.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("NFS LB Controller running");

        tokio::select! {
            result = &mut self.node_watcher => {
                return result.map_err(|e| ControllerError::Watch(format!("Node watcher panicked: {}", e)))?;
            }
            _ = shutdown_signal() => {
                info!("Received shutdown signal, stopping NFS LB Controller");
            }
        }

        self.node_watcher.abort();
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
