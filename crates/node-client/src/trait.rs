//! NodeClient trait for mocking
//!
//! Abstracts the authoritative Node store so the controller can be unit
//! tested against an in-memory implementation.

use crate::error::NodeClientError;
use k8s_openapi::api::core::v1::Node;

/// Operations against the authoritative Node store.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait NodeClientTrait: Send + Sync {
    /// Fetch a node by name straight from the API server.
    async fn get_node(&self, name: &str) -> Result<Node, NodeClientError>;

    /// List every node in the cluster.
    async fn list_nodes(&self) -> Result<Vec<Node>, NodeClientError>;

    /// Replace the full node resource.
    ///
    /// The write is checked against `metadata.resourceVersion`; a stale
    /// version yields [`NodeClientError::Conflict`].
    async fn replace_node(&self, node: &Node) -> Result<Node, NodeClientError>;
}
