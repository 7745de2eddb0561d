//! Retry pacing for scheduler connections.
//!
//! The supervisor redials after every lost session; [`BackoffPolicy`]
//! decides how long to wait between failed dials. The policy itself is
//! stateless: the supervisor tracks the failure count and resets it
//! once a session is established.

use std::time::Duration;

/// Pacing of repeated connection attempts.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Wait after the first failed attempt.
    pub first: Duration,
    /// Ceiling no wait ever exceeds.
    pub cap: Duration,
    /// Growth factor applied per additional failure.
    pub factor: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            factor: 2,
        }
    }
}

impl BackoffPolicy {
    /// Wait before the next dial, given `failures` failed attempts so
    /// far (the first failure is `1`). Saturates at the ceiling.
    pub fn wait_after(&self, failures: u32) -> Duration {
        let scale = self.factor.saturating_pow(failures.saturating_sub(1));
        self.first.saturating_mul(scale).min(self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_grow_geometrically_up_to_the_cap() {
        let policy = BackoffPolicy::default();
        let waits: Vec<u64> = (1..=7).map(|n| policy.wait_after(n).as_secs()).collect();
        assert_eq!(waits, [1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn extreme_failure_counts_saturate_instead_of_overflowing() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.wait_after(u32::MAX), policy.cap);
    }

    #[test]
    fn custom_ceiling_is_respected() {
        let policy = BackoffPolicy {
            cap: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(policy.wait_after(10), Duration::from_secs(5));
    }
}
