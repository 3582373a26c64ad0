//! Startup configuration.
//!
//! Read once from environment variables; the pool is immutable afterwards.

use crate::controller::ControllerOptions;
use crate::error::ControllerError;
use std::net::IpAddr;
use std::time::Duration;
use tracing::warn;

/// Comma-separated list of NFS server IP addresses
pub const ENV_IP_ADDRESSES: &str = "NFS_LB_IP_ADDRESSES";
/// Enables node load balancing (default: true)
pub const ENV_ENABLED: &str = "NFS_LB_ENABLED";
/// Per-update timeout in seconds (default: 30)
pub const ENV_UPDATE_TIMEOUT_SECS: &str = "NFS_LB_UPDATE_TIMEOUT_SECS";
/// Conflict retries per operation (default: 5)
pub const ENV_CONFLICT_RETRIES: &str = "NFS_LB_CONFLICT_RETRIES";

const DEFAULT_UPDATE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONFLICT_RETRIES: u32 = 5;

/// NFS LB Controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LbConfig {
    pub enabled: bool,
    pub ip_addresses: Vec<String>,
    pub update_timeout: Duration,
    pub conflict_retries: u32,
}

impl LbConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let enabled = match lookup(ENV_ENABLED) {
            Some(raw) => parse_bool(ENV_ENABLED, &raw)?,
            None => true,
        };

        let ip_addresses = parse_ip_list(lookup(ENV_IP_ADDRESSES).as_deref().unwrap_or_default())?;
        if enabled && ip_addresses.is_empty() {
            return Err(ControllerError::InvalidConfig(format!(
                "NFS LB controller requires at least one valid IP address for the target NFS server(s), set {}",
                ENV_IP_ADDRESSES
            )));
        }

        let update_timeout = match lookup(ENV_UPDATE_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_number(ENV_UPDATE_TIMEOUT_SECS, &raw)?),
            None => Duration::from_secs(DEFAULT_UPDATE_TIMEOUT_SECS),
        };
        if update_timeout.is_zero() {
            return Err(ControllerError::InvalidConfig(format!(
                "{} must be greater than zero",
                ENV_UPDATE_TIMEOUT_SECS
            )));
        }

        let conflict_retries = match lookup(ENV_CONFLICT_RETRIES) {
            Some(raw) => parse_number(ENV_CONFLICT_RETRIES, &raw)?,
            None => DEFAULT_CONFLICT_RETRIES,
        };

        Ok(Self {
            enabled,
            ip_addresses,
            update_timeout,
            conflict_retries,
        })
    }

    /// Persist tunables for [`crate::LbController`].
    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            update_timeout: self.update_timeout,
            conflict_retries: self.conflict_retries,
        }
    }
}

/// Parse a comma-separated IP list into an ordered, duplicate-free pool.
pub fn parse_ip_list(raw: &str) -> Result<Vec<String>, ControllerError> {
    let mut pool: Vec<String> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if entry.parse::<IpAddr>().is_err() {
            return Err(ControllerError::InvalidConfig(format!(
                "invalid NFS server IP address {:?}",
                entry
            )));
        }
        if pool.iter().any(|ip| ip == entry) {
            warn!("Dropping duplicate NFS server IP {}", entry);
            continue;
        }
        pool.push(entry.to_string());
    }

    Ok(pool)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ControllerError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ControllerError::InvalidConfig(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ControllerError> {
    raw.trim().parse().map_err(|_| {
        ControllerError::InvalidConfig(format!("{} must be a non-negative integer, got {:?}", key, raw))
    })
}
