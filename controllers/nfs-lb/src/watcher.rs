//! Node snapshot cache.
//!
//! A reflector-backed, eventually consistent view of cluster `Node`s. The
//! store is filled by a watch stream running on its own task; lookups never
//! block and never hit the API server. Data read here is only used to make
//! decisions: writes always go to the authoritative store.

use crate::error::ControllerError;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::{Api, Client};
use kube_runtime::reflector::{self, ObjectRef, Store};
use kube_runtime::{watcher, WatchStreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Read-only handle on the watched node cache.
#[derive(Clone)]
pub struct NodeSnapshotCache {
    store: Store<Node>,
}

impl std::fmt::Debug for NodeSnapshotCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSnapshotCache")
            .field("nodes", &self.store.state().len())
            .finish()
    }
}

impl NodeSnapshotCache {
    /// Wrap an existing reflector store.
    pub fn new(store: Store<Node>) -> Self {
        Self { store }
    }

    /// Start watching all nodes in the background.
    ///
    /// The returned task only finishes if the watch stream ends, which it
    /// should not do while the process is healthy.
    pub fn spawn(client: Client) -> (Self, JoinHandle<Result<(), ControllerError>>) {
        let api: Api<Node> = Api::all(client);
        let (store, writer) = reflector::store();

        let handle = tokio::spawn(watch_nodes(api, writer));

        (Self::new(store), handle)
    }

    /// Wait for the first complete listing to be in the cache.
    pub async fn wait_until_ready(&self) -> Result<(), ControllerError> {
        self.store
            .wait_until_ready()
            .await
            .map_err(|e| ControllerError::CacheSync(e.to_string()))
    }

    /// Cached node by name.
    pub fn get(&self, name: &str) -> Option<Arc<Node>> {
        self.store.get(&ObjectRef::new(name))
    }

    /// Every cached node, in no particular order.
    pub fn list(&self) -> Vec<Arc<Node>> {
        self.store.state()
    }
}

async fn watch_nodes(
    api: Api<Node>,
    writer: reflector::store::Writer<Node>,
) -> Result<(), ControllerError> {
    info!("Starting Node watcher");

    let mut stream = Box::pin(
        reflector::reflector(writer, watcher(api, watcher::Config::default()))
            .default_backoff()
            .touched_objects(),
    );

    while let Some(result) = stream.next().await {
        match result {
            Ok(node) => {
                debug!(
                    "Node cache updated: {}",
                    node.metadata.name.as_deref().unwrap_or("<unknown>")
                );
            }
            Err(e) => {
                // Backoff is applied by the stream; keep going
                warn!("Node watcher error: {}", e);
            }
        }
    }

    Err(ControllerError::Watch("Node watch stream ended".to_string()))
}
