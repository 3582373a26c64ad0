//! # Fibonacci Backoff
//!
//! Spacing between optimistic-concurrency retries against the Node store.
//! Grows more slowly than exponential backoff, so a handful of retries stays
//! well under a typical volume-staging deadline.
//!
//! Default sequence: 50ms, 50ms, 100ms, 150ms, 250ms, 400ms, 650ms, 1s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max_millis`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Previous backoff value in milliseconds
    prev_millis: u64,
    /// Current backoff value in milliseconds
    current_millis: u64,
    /// Maximum backoff value in milliseconds
    max_millis: u64,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(50, 1_000)
    }
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with minimum and maximum values in milliseconds
    #[must_use]
    pub fn new(min_millis: u64, max_millis: u64) -> Self {
        Self {
            prev_millis: 0,
            current_millis: min_millis,
            max_millis,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = Duration::from_millis(self.current_millis);

        let next_millis = self.prev_millis + self.current_millis;
        self.prev_millis = self.current_millis;
        self.current_millis = std::cmp::min(next_millis, self.max_millis);

        result
    }
}
