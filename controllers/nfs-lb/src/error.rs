//! Controller-specific error types.
//!
//! This module defines error types specific to the NFS LB Controller
//! that are not covered by upstream library errors.

use node_client::NodeClientError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the NFS LB Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Node store error outside a per-node operation
    #[error("Node store error: {0}")]
    NodeClient(#[from] NodeClientError),

    /// Node is not present in the node cache
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Persisting the node failed
    #[error("Failed to update node {node}: {source}")]
    Store {
        /// Node being updated
        node: String,
        /// Underlying store error
        #[source]
        source: NodeClientError,
    },

    /// Node kept changing underneath us; retries exhausted
    #[error("Node {node} was modified concurrently, gave up after {attempts} attempts")]
    Conflict {
        /// Node being updated
        node: String,
        /// Persist attempts made, first one included
        attempts: u32,
    },

    /// Persisting the node did not finish in time
    #[error("Timed out after {timeout:?} updating node {node}")]
    Timeout {
        /// Node being updated
        node: String,
        /// Configured per-call limit
        timeout: Duration,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Node cache never finished its initial sync
    #[error("Node cache sync failed: {0}")]
    CacheSync(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}

impl ControllerError {
    /// Whether the whole operation may succeed if the caller tries again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ControllerError::Conflict { .. } | ControllerError::Timeout { .. } => true,
            ControllerError::Store { source, .. } => matches!(
                source,
                NodeClientError::Kube(_) | NodeClientError::Api(_) | NodeClientError::Conflict(_)
            ),
            _ => false,
        }
    }

    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, ControllerError::Store { source, .. } if source.is_conflict())
    }
}
