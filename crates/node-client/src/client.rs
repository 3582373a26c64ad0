//! Node store client
//!
//! Implements [`NodeClientTrait`] on top of the cluster-scoped `Api<Node>`.

use crate::error::NodeClientError;
use crate::node_trait::NodeClientTrait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{ListParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

/// Kubernetes Node store client
#[derive(Clone)]
pub struct NodeClient {
    api: Api<Node>,
}

impl std::fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClient").finish_non_exhaustive()
    }
}

impl NodeClient {
    /// Create a new client from a kube client
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }
}

#[async_trait::async_trait]
impl NodeClientTrait for NodeClient {
    async fn get_node(&self, name: &str) -> Result<Node, NodeClientError> {
        debug!("GET node {}", name);
        self.api
            .get(name)
            .await
            .map_err(|e| NodeClientError::from_kube(name, e))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, NodeClientError> {
        debug!("LIST nodes");
        let list = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(|e| NodeClientError::from_kube("nodes", e))?;
        Ok(list.items)
    }

    async fn replace_node(&self, node: &Node) -> Result<Node, NodeClientError> {
        let name = node
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| NodeClientError::Invalid("node is missing metadata.name".to_string()))?;

        debug!(
            "PUT node {} (resourceVersion {})",
            name,
            node.metadata.resource_version.as_deref().unwrap_or("<none>")
        );

        self.api
            .replace(name, &PostParams::default(), node)
            .await
            .map_err(|e| NodeClientError::from_kube(name, e))
    }
}
