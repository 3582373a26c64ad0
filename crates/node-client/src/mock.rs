//! Mock NodeClient for unit testing
//!
//! Stores nodes in memory and emulates the API server's optimistic
//! concurrency: every write bumps `metadata.resourceVersion`, and a replace
//! carrying a stale version fails with [`NodeClientError::Conflict`].
//!
//! A reflector [`Writer`] can be attached so successful replaces are
//! delivered to a node cache the same way a watch event would be.

use crate::error::NodeClientError;
use crate::node_trait::NodeClientTrait;
use k8s_openapi::api::core::v1::Node;
use kube_runtime::reflector::store::Writer;
use kube_runtime::watcher;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock NodeClient for testing
#[derive(Clone)]
pub struct MockNodeClient {
    pub(crate) nodes: Arc<Mutex<HashMap<String, Node>>>,
    pub(crate) next_version: Arc<AtomicU64>,
    pub(crate) replace_calls: Arc<AtomicUsize>,
    pub(crate) replace_failures: Arc<Mutex<VecDeque<NodeClientError>>>,
    pub(crate) replace_delay: Arc<Mutex<Option<Duration>>>,
    pub(crate) cache_writer: Arc<Mutex<Option<Writer<Node>>>>,
}

impl std::fmt::Debug for MockNodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockNodeClient")
            .field("nodes", &self.nodes.lock().unwrap().len())
            .field("replace_calls", &self.replace_calls())
            .finish()
    }
}

impl Default for MockNodeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNodeClient {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(Mutex::new(HashMap::new())),
            next_version: Arc::new(AtomicU64::new(1)),
            replace_calls: Arc::new(AtomicUsize::new(0)),
            replace_failures: Arc::new(Mutex::new(VecDeque::new())),
            replace_delay: Arc::new(Mutex::new(None)),
            cache_writer: Arc::new(Mutex::new(None)),
        }
    }

    /// Mirror every successful replace into `writer` as a watch `Apply` event.
    pub fn with_cache_writer(self, writer: Writer<Node>) -> Self {
        *self.cache_writer.lock().unwrap() = Some(writer);
        self
    }

    /// Add a node to the mock store (for test setup)
    ///
    /// Returns the stored copy, which carries the assigned resourceVersion.
    pub fn add_node(&self, mut node: Node) -> Node {
        let name = node.metadata.name.clone().unwrap_or_default();
        node.metadata.resource_version = Some(self.bump_version());
        self.nodes.lock().unwrap().insert(name, node.clone());
        node
    }

    /// Edit a stored node as an external actor would.
    ///
    /// The change bumps the resourceVersion but is not mirrored into the
    /// cache writer, so cached copies go stale.
    pub fn modify_node<F>(&self, name: &str, f: F) -> Option<Node>
    where
        F: FnOnce(&mut Node),
    {
        let version = self.bump_version();
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(name)?;
        f(node);
        node.metadata.resource_version = Some(version);
        Some(node.clone())
    }

    /// Delete a stored node as an external actor would.
    ///
    /// Not mirrored into the cache writer, so the cache keeps serving the
    /// deleted node.
    pub fn delete_node(&self, name: &str) -> Option<Node> {
        self.nodes.lock().unwrap().remove(name)
    }

    /// Current stored copy of a node
    pub fn node(&self, name: &str) -> Option<Node> {
        self.nodes.lock().unwrap().get(name).cloned()
    }

    /// Fail the next replace call with `error` (queued, one per call)
    pub fn fail_next_replace(&self, error: NodeClientError) {
        self.replace_failures.lock().unwrap().push_back(error);
    }

    /// Delay every replace call by `delay` before it touches the store
    pub fn set_replace_delay(&self, delay: Option<Duration>) {
        *self.replace_delay.lock().unwrap() = delay;
    }

    /// Number of replace calls received, failed ones included
    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    fn bump_version(&self) -> String {
        self.next_version.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

#[async_trait::async_trait]
impl NodeClientTrait for MockNodeClient {
    async fn get_node(&self, name: &str) -> Result<Node, NodeClientError> {
        self.node(name)
            .ok_or_else(|| NodeClientError::NotFound(name.to_string()))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, NodeClientError> {
        Ok(self.nodes.lock().unwrap().values().cloned().collect())
    }

    async fn replace_node(&self, node: &Node) -> Result<Node, NodeClientError> {
        let delay = *self.replace_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.replace_calls.fetch_add(1, Ordering::SeqCst);

        let injected = self.replace_failures.lock().unwrap().pop_front();
        if let Some(error) = injected {
            return Err(error);
        }

        let name = node
            .metadata
            .name
            .clone()
            .ok_or_else(|| NodeClientError::Invalid("node is missing metadata.name".to_string()))?;

        let updated = {
            let mut nodes = self.nodes.lock().unwrap();
            let current = nodes
                .get(&name)
                .ok_or_else(|| NodeClientError::NotFound(name.clone()))?;

            if let Some(expected) = node.metadata.resource_version.as_deref() {
                let actual = current.metadata.resource_version.as_deref().unwrap_or_default();
                if expected != actual {
                    return Err(NodeClientError::Conflict(format!(
                        "{}: resourceVersion {} is stale (current {})",
                        name, expected, actual
                    )));
                }
            }

            let mut updated = node.clone();
            updated.metadata.resource_version = Some(self.bump_version());
            nodes.insert(name, updated.clone());
            updated
        };

        if let Some(writer) = self.cache_writer.lock().unwrap().as_mut() {
            writer.apply_watcher_event(&watcher::Event::Apply(updated.clone()));
        }

        Ok(updated)
    }
}
