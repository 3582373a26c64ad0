//! Least-loaded allocation policy.

use crate::counters::AssignmentCounters;

/// Pick the pool IP with the fewest assigned nodes.
///
/// Ties go to the lexicographically smallest IP string, so the result never
/// depends on map iteration order. Returns `None` only for an empty pool.
pub fn select_least_loaded<'a>(counters: &AssignmentCounters, pool: &'a [String]) -> Option<&'a str> {
    pool.iter()
        .min_by(|a, b| {
            let load_a = counters.get(a).unwrap_or(0);
            let load_b = counters.get(b).unwrap_or(0);
            load_a.cmp(&load_b).then_with(|| a.cmp(b))
        })
        .map(String::as_str)
}
