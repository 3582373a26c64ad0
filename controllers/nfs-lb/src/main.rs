//! NFS LB Controller
//!
//! Assigns load-balanced NFS server IPs to cluster nodes.
//!
//! Configuration is read from environment variables, see
//! [`nfs_lb_controller::config`].

use anyhow::Context;
use nfs_lb_controller::{LbConfig, Service};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting NFS LB Controller");

    // kube's rustls stack needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = LbConfig::from_env().context("Failed to load configuration")?;

    if !config.enabled {
        info!("Node load balancing is disabled, nothing to do");
        return Ok(());
    }

    info!("Configuration:");
    info!("  NFS server IPs: {}", config.ip_addresses.join(", "));
    info!("  Update timeout: {:?}", config.update_timeout);
    info!("  Conflict retries: {}", config.conflict_retries);

    let service = Service::new(&config)
        .await
        .context("Failed to start NFS LB Controller")?;
    service.run().await?;

    Ok(())
}
