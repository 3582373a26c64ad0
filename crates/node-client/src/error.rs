//! Node client errors

use thiserror::Error;

/// Errors that can occur when talking to the Node store
#[derive(Debug, Error)]
pub enum NodeClientError {
    /// Transport, decoding or other client-side failure
    #[error("Kubernetes error: {0}")]
    Kube(#[source] kube::Error),

    /// The API server rejected the request
    #[error("Kubernetes API error: {0}")]
    Api(String),

    /// Node does not exist
    #[error("Node not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency check failed (stale resourceVersion)
    #[error("Conflict updating node: {0}")]
    Conflict(String),

    /// Request could not be built (e.g. node without a name)
    #[error("Invalid request: {0}")]
    Invalid(String),
}

impl NodeClientError {
    /// Classify a kube error raised while operating on node `name`.
    pub fn from_kube(name: &str, error: kube::Error) -> Self {
        match error {
            kube::Error::Api(ref response) if response.code == 404 => {
                NodeClientError::NotFound(name.to_string())
            }
            kube::Error::Api(ref response) if response.code == 409 => {
                NodeClientError::Conflict(format!("{}: {}", name, response.message))
            }
            kube::Error::Api(ref response) => NodeClientError::Api(format!(
                "{} ({}): {}",
                name, response.code, response.message
            )),
            other => NodeClientError::Kube(other),
        }
    }

    /// Whether the node does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NodeClientError::NotFound(_))
    }

    /// Whether the write lost an optimistic-concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, NodeClientError::Conflict(_))
    }
}

impl From<kube::Error> for NodeClientError {
    fn from(error: kube::Error) -> Self {
        NodeClientError::from_kube("<unknown>", error)
    }
}
