//! NFS LB Controller
//!
//! Assigns one NFS server IP, from a fixed pool of load-balanced endpoints,
//! to every node that mounts an NFS-backed volume, and records the choice
//! as a node annotation so it survives restarts.
//!
//! The storage driver calls [`LbController::assign_ip_to_node`] when staging
//! a volume and [`LbController::remove_ip_from_node`] when unstaging it.

pub mod backoff;
pub mod config;
pub mod controller;
pub mod counters;
pub mod error;
pub mod policy;
pub mod service;
pub mod watcher;

#[cfg(test)]
mod test_utils;

pub use config::LbConfig;
pub use controller::{ControllerOptions, LbController, NODE_ANNOTATION};
pub use counters::AssignmentCounters;
pub use error::ControllerError;
pub use service::Service;
pub use watcher::NodeSnapshotCache;
