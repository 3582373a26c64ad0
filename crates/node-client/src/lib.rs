//! Kubernetes Node store client
//!
//! Thin, mockable access to the authoritative `Node` resources that the
//! NFS LB controller annotates with assigned server IPs.
//!
//! # Example
//!
//! ```no_run
//! use node_client::{NodeClient, NodeClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NodeClient::new(kube::Client::try_default().await?);
//!
//! let mut node = client.get_node("worker-1").await?;
//! node.metadata
//!     .annotations
//!     .get_or_insert_with(Default::default)
//!     .insert("example.com/owner".to_string(), "me".to_string());
//!
//! // Fails with `NodeClientError::Conflict` if the node changed since `get_node`.
//! client.replace_node(&node).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod node_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::NodeClient;
pub use error::NodeClientError;
pub use node_trait::NodeClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockNodeClient;
