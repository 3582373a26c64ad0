//! NFS server IP assignment controller.
//!
//! Assigns each node one IP from a fixed pool of NFS server endpoints,
//! recording the choice in a node annotation, and keeps per-IP counters so
//! new assignments go to the least-loaded server.
//!
//! Counters are rebuilt from the node cache once at construction and then
//! updated incrementally by [`LbController::assign_ip_to_node`] and
//! [`LbController::remove_ip_from_node`]. Annotations edited by anything
//! else after startup are not picked up until the next restart.
//!
//! Both operations hold one controller-wide mutex from the cache lookup
//! through the counter update. Dropping an in-flight call releases the
//! mutex; counters only ever change after a persist call has succeeded.

use crate::backoff::FibonacciBackoff;
use crate::counters::AssignmentCounters;
use crate::error::ControllerError;
use crate::policy::select_least_loaded;
use crate::watcher::NodeSnapshotCache;
use k8s_openapi::api::core::v1::Node;
use node_client::NodeClientTrait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Node annotation holding the assigned NFS server IP.
pub const NODE_ANNOTATION: &str = "nfs.lb.csi.storage.gke.io/assigned-ip";

/// Tunables for persisting node updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Upper bound on a single node update call
    pub update_timeout: Duration,
    /// Re-fetch and retry this many times after a conflict
    pub conflict_retries: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            update_timeout: Duration::from_secs(30),
            conflict_retries: 5,
        }
    }
}

/// Assigns pool IPs to nodes and tracks how many nodes use each IP.
pub struct LbController {
    client: Arc<dyn NodeClientTrait>,
    cache: NodeSnapshotCache,
    pool: Vec<String>,
    counters: Mutex<AssignmentCounters>,
    options: ControllerOptions,
}

impl std::fmt::Debug for LbController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LbController")
            .field("pool", &self.pool)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Value of the assignment annotation, if any.
pub fn assigned_ip(node: &Node) -> Option<&str> {
    node.metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(NODE_ANNOTATION))
        .map(String::as_str)
}

fn node_name(node: &Node) -> &str {
    node.metadata.name.as_deref().unwrap_or("<unknown>")
}

/// Copy of `node` annotated with `ip`; everything else is preserved.
fn with_assignment(node: &Node, ip: &str) -> Node {
    let mut copy = node.clone();
    copy.metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(NODE_ANNOTATION.to_string(), ip.to_string());
    copy
}

/// Copy of `node` without the assignment annotation.
fn without_assignment(node: &Node) -> Node {
    let mut copy = node.clone();
    if let Some(annotations) = copy.metadata.annotations.as_mut() {
        annotations.remove(NODE_ANNOTATION);
    }
    copy
}

/// Count nodes per pool IP from their annotations.
///
/// Nodes annotated with an IP outside the pool are ignored.
pub fn resync_counters<'a, I>(pool: &[String], nodes: I) -> AssignmentCounters
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut counters = AssignmentCounters::new(pool);

    for node in nodes {
        if let Some(ip) = assigned_ip(node) {
            info!("Node {} already has IP {} assigned", node_name(node), ip);
            if !counters.increment(ip) {
                debug!(
                    "IP {} on node {} is not in the NFS server IP list, ignoring",
                    ip,
                    node_name(node)
                );
            }
        }
    }

    trace!("LB controller counters resynced: {:?}", counters);
    counters
}

impl LbController {
    /// Creates a controller once the node cache has synced.
    ///
    /// Fails if `pool` is empty. Counters are computed from the cache
    /// contents exactly once, here.
    pub async fn new(
        pool: Vec<String>,
        client: Arc<dyn NodeClientTrait>,
        cache: NodeSnapshotCache,
        options: ControllerOptions,
    ) -> Result<Self, ControllerError> {
        if pool.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "NFS LB controller requires at least one NFS server IP address".to_string(),
            ));
        }

        info!("Waiting for node cache to sync");
        cache.wait_until_ready().await?;

        let nodes = cache.list();
        let counters = resync_counters(&pool, nodes.iter().map(|n| &**n));
        info!(
            "LB controller ready: {} NFS server IPs, {} of {} nodes assigned",
            pool.len(),
            counters.total(),
            nodes.len()
        );

        Ok(Self {
            client,
            cache,
            pool,
            counters: Mutex::new(counters),
            options,
        })
    }

    /// The configured NFS server IPs, in configuration order.
    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    /// The node cache lookups are served from.
    pub fn cache(&self) -> &NodeSnapshotCache {
        &self.cache
    }

    /// Snapshot of the current counters.
    pub async fn counters(&self) -> AssignmentCounters {
        self.counters.lock().await.clone()
    }

    /// Returns the NFS server IP `node_name` should mount from, assigning
    /// the least-loaded one if the node has none yet.
    ///
    /// Idempotent: a node already annotated with a pool IP gets that IP back
    /// without any write. A node annotated with an IP that is no longer in
    /// the pool is reassigned.
    pub async fn assign_ip_to_node(
        &self,
        node_name: &str,
        volume_id: &str,
    ) -> Result<String, ControllerError> {
        let mut counters = self.counters.lock().await;

        let cached = self
            .cache
            .get(node_name)
            .ok_or_else(|| ControllerError::NodeNotFound(node_name.to_string()))?;

        if let Some(ip) = assigned_ip(&cached) {
            if counters.contains(ip) {
                info!("Node {} already has IP {} assigned", node_name, ip);
                return Ok(ip.to_string());
            }
            debug!(
                "IP {} not found among the NFS server IP list, reassigning a new IP to node {}",
                ip, node_name
            );
        }

        let mut node: Node = (*cached).clone();
        let mut backoff = FibonacciBackoff::default();
        let mut attempt: u32 = 0;

        loop {
            let selected = select_least_loaded(&counters, &self.pool)
                .ok_or_else(|| ControllerError::InvalidConfig("NFS server IP list is empty".to_string()))?
                .to_string();

            debug!(
                "Assigning IP {} to node {} for volume {}",
                selected, node_name, volume_id
            );

            match self.replace(node_name, &with_assignment(&node, &selected)).await {
                Ok(()) => {
                    counters.increment(&selected);
                    trace!(
                        "assign_ip_to_node: volume {}, node {}, IP {}, counters {:?}",
                        volume_id, node_name, selected, *counters
                    );
                    return Ok(selected);
                }
                Err(e) if e.is_conflict() && attempt < self.options.conflict_retries => {
                    attempt += 1;
                    warn!(
                        "Conflict assigning IP to node {} (attempt {}/{}), re-fetching: {}",
                        node_name, attempt, self.options.conflict_retries, e
                    );
                    tokio::time::sleep(backoff.next_backoff()).await;

                    let fresh = self.fetch(node_name).await?;
                    if let Some(ip) = assigned_ip(&fresh) {
                        if counters.contains(ip) {
                            // Usually our own earlier write not yet seen by the cache
                            info!("Node {} already has IP {} assigned", node_name, ip);
                            return Ok(ip.to_string());
                        }
                    }
                    node = fresh;
                }
                Err(e) if e.is_conflict() => {
                    return Err(ControllerError::Conflict {
                        node: node_name.to_string(),
                        attempts: attempt + 1,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Drops the IP assignment from `node_name`.
    ///
    /// Succeeds without doing anything when the node is unknown, carries no
    /// assignment, or carries an IP outside the pool.
    pub async fn remove_ip_from_node(
        &self,
        node_name: &str,
        volume_id: &str,
    ) -> Result<(), ControllerError> {
        let mut counters = self.counters.lock().await;

        let Some(cached) = self.cache.get(node_name) else {
            debug!(
                "Node {} not found, skip remove_ip_from_node for volume {}",
                node_name, volume_id
            );
            return Ok(());
        };

        let Some(ip) = assigned_ip(&cached) else {
            debug!(
                "Node {} does not have annotation {}, skip remove_ip_from_node for volume {}",
                node_name, NODE_ANNOTATION, volume_id
            );
            return Ok(());
        };

        if !counters.contains(ip) {
            debug!(
                "IP {} is not in the NFS server IP list, skip remove_ip_from_node for volume {}",
                ip, volume_id
            );
            return Ok(());
        }

        let mut ip = ip.to_string();
        let mut node: Node = (*cached).clone();
        let mut backoff = FibonacciBackoff::default();
        let mut attempt: u32 = 0;

        loop {
            debug!(
                "Removing IP annotation {} from node {} for volume {}",
                ip, node_name, volume_id
            );

            match self.replace(node_name, &without_assignment(&node)).await {
                Ok(()) => {
                    if !counters.decrement(&ip) {
                        warn!("Counter for IP {} was already zero", ip);
                    }
                    trace!(
                        "remove_ip_from_node: volume {}, node {}, IP {}, counters {:?}",
                        volume_id, node_name, ip, *counters
                    );
                    return Ok(());
                }
                Err(e) if e.is_conflict() && attempt < self.options.conflict_retries => {
                    attempt += 1;
                    warn!(
                        "Conflict removing IP from node {} (attempt {}/{}), re-fetching: {}",
                        node_name, attempt, self.options.conflict_retries, e
                    );
                    tokio::time::sleep(backoff.next_backoff()).await;

                    let fresh = match self.fetch(node_name).await {
                        Ok(fresh) => fresh,
                        Err(ControllerError::NodeNotFound(_)) => {
                            debug!("Node {} was deleted, dropping IP {}", node_name, ip);
                            counters.decrement(&ip);
                            return Ok(());
                        }
                        Err(e) => return Err(e),
                    };

                    let current = assigned_ip(&fresh)
                        .filter(|current| counters.contains(current))
                        .map(str::to_string);
                    match current {
                        Some(current) => {
                            ip = current;
                            node = fresh;
                        }
                        None => {
                            // Usually our own earlier removal not yet seen by the cache
                            debug!(
                                "Node {} no longer has a pool IP assigned, skip remove_ip_from_node for volume {}",
                                node_name, volume_id
                            );
                            return Ok(());
                        }
                    }
                }
                Err(e) if e.is_conflict() => {
                    return Err(ControllerError::Conflict {
                        node: node_name.to_string(),
                        attempts: attempt + 1,
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Persist `node`, bounded by the update timeout.
    async fn replace(&self, node_name: &str, node: &Node) -> Result<(), ControllerError> {
        match tokio::time::timeout(self.options.update_timeout, self.client.replace_node(node)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(source)) => Err(ControllerError::Store {
                node: node_name.to_string(),
                source,
            }),
            Err(_) => Err(ControllerError::Timeout {
                node: node_name.to_string(),
                timeout: self.options.update_timeout,
            }),
        }
    }

    /// Read `node_name` from the authoritative store.
    async fn fetch(&self, node_name: &str) -> Result<Node, ControllerError> {
        match self.client.get_node(node_name).await {
            Ok(node) => Ok(node),
            Err(e) if e.is_not_found() => Err(ControllerError::NodeNotFound(node_name.to_string())),
            Err(source) => Err(ControllerError::Store {
                node: node_name.to_string(),
                source,
            }),
        }
    }
}
