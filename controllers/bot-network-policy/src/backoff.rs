//! # Fibonacci Backoff
//!
//! Retry delays for failed reconciliations, in minutes:
//! 1m, 1m, 2m, 3m, 5m, 8m, 10m (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each step is the sum of the previous two, capped at `max_minutes`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in minutes (for reset)
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min_minutes` and capped at `max_minutes`
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = Duration::from_secs(self.current_minutes * 60);

        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = std::cmp::min(next_minutes, self.max_minutes);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(backoff: &mut FibonacciBackoff) -> u64 {
        backoff.next_backoff().as_secs() / 60
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        let sequence: Vec<u64> = (0..7).map(|_| minutes(&mut backoff)).collect();
        assert_eq!(sequence, vec![1, 1, 2, 3, 5, 8, 10]);
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        for _ in 0..7 {
            backoff.next_backoff();
        }
        // 13m would be next; stays at the cap
        assert_eq!(backoff.next_backoff(), Duration::from_secs(600));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(600));
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        for _ in 0..4 {
            backoff.next_backoff();
        }

        backoff.reset();

        assert_eq!(minutes(&mut backoff), 1);
        assert_eq!(minutes(&mut backoff), 1);
        assert_eq!(minutes(&mut backoff), 2);
    }
}
