//! Assignment counters.
//!
//! Number of nodes annotated with each pool IP, as last observed or written
//! by this controller. The key set is exactly the IP pool; IPs outside the
//! pool are never tracked.

use std::collections::BTreeMap;

/// Pool IP -> number of nodes assigned to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentCounters {
    counts: BTreeMap<String, usize>,
}

impl AssignmentCounters {
    /// Zeroed counters for every IP in `pool`.
    pub fn new<I, S>(pool: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            counts: pool.into_iter().map(|ip| (ip.into(), 0)).collect(),
        }
    }

    /// Whether `ip` belongs to the pool.
    pub fn contains(&self, ip: &str) -> bool {
        self.counts.contains_key(ip)
    }

    /// Count for `ip`, `None` if it is not in the pool.
    pub fn get(&self, ip: &str) -> Option<usize> {
        self.counts.get(ip).copied()
    }

    /// Count one more node on `ip`. Returns false if `ip` is not in the pool.
    pub fn increment(&mut self, ip: &str) -> bool {
        match self.counts.get_mut(ip) {
            Some(count) => {
                *count += 1;
                true
            }
            None => false,
        }
    }

    /// Count one node fewer on `ip`, never going below zero.
    ///
    /// Returns false if `ip` is not in the pool or was already zero.
    pub fn decrement(&mut self, ip: &str) -> bool {
        match self.counts.get_mut(ip) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Sum over all pool IPs.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of pool IPs tracked.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True only for an empty pool.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `(ip, count)` pairs in ascending IP order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(ip, count)| (ip.as_str(), *count))
    }
}
