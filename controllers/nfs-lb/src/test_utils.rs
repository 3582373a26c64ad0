//! Test utilities for unit testing the controller
//!
//! Builds nodes, a pre-synced node cache and a controller wired to
//! `MockNodeClient`.

use crate::controller::{ControllerOptions, LbController, NODE_ANNOTATION};
use crate::watcher::NodeSnapshotCache;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube_runtime::reflector::{self, store::Writer};
use kube_runtime::watcher;
use node_client::MockNodeClient;
use std::sync::Arc;
use std::time::Duration;

/// Name and optional assigned IP of a test node
#[derive(Debug, Clone, Copy)]
pub struct TestNode {
    pub name: &'static str,
    pub assigned_ip: Option<&'static str>,
}

impl TestNode {
    pub fn new(name: &'static str, assigned_ip: Option<&'static str>) -> Self {
        Self { name, assigned_ip }
    }
}

/// Helper to create a test Node, optionally carrying the assignment annotation
pub fn new_node(name: &str, assigned_ip: Option<&str>) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            annotations: assigned_ip
                .map(|ip| [(NODE_ANNOTATION.to_string(), ip.to_string())].into()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn new_node_pool(nodes: &[TestNode]) -> Vec<Node> {
    nodes
        .iter()
        .map(|n| new_node(n.name, n.assigned_ip))
        .collect()
}

/// Node cache that has already received its initial listing of `nodes`
pub fn synced_cache(nodes: &[Node]) -> (NodeSnapshotCache, Writer<Node>) {
    let (store, mut writer) = reflector::store();
    writer.apply_watcher_event(&watcher::Event::Init);
    for node in nodes {
        writer.apply_watcher_event(&watcher::Event::InitApply(node.clone()));
    }
    writer.apply_watcher_event(&watcher::Event::InitDone);
    (NodeSnapshotCache::new(store), writer)
}

pub fn pool(ips: &[&str]) -> Vec<String> {
    ips.iter().map(|ip| ip.to_string()).collect()
}

pub fn test_options() -> ControllerOptions {
    ControllerOptions {
        update_timeout: Duration::from_secs(5),
        conflict_retries: 3,
    }
}

/// Controller over `MockNodeClient` seeded with `nodes`
///
/// Successful updates are delivered to the node cache immediately, as if
/// the watch were instantaneous.
pub async fn new_fake_controller(ips: &[&str], nodes: Vec<Node>) -> (LbController, MockNodeClient) {
    new_fake_controller_with_options(ips, nodes, test_options()).await
}

pub async fn new_fake_controller_with_options(
    ips: &[&str],
    nodes: Vec<Node>,
    options: ControllerOptions,
) -> (LbController, MockNodeClient) {
    let client = MockNodeClient::new();
    let stored: Vec<Node> = nodes.into_iter().map(|n| client.add_node(n)).collect();

    let (cache, writer) = synced_cache(&stored);
    let client = client.with_cache_writer(writer);

    let controller = LbController::new(pool(ips), Arc::new(client.clone()), cache, options)
        .await
        .expect("Failed to create controller");

    (controller, client)
}
