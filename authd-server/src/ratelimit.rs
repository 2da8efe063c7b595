//! Per-caller sliding-window rate limiting for the two public endpoints.
//!
//! Counters are instance-local by design: this is a best-effort guard
//! against credential guessing and code/verifier brute force, and
//! horizontal scaling dilutes it proportionally unless the counters are
//! externalized. The protocol invariants themselves never depend on it.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited { retry_after_secs: u64 },
}

/// Sliding window over recent request timestamps, keyed per caller
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    callers: RwLock<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            callers: RwLock::new(HashMap::new()),
        }
    }

    pub async fn check(&self, caller: &str) -> Decision {
        let now = Instant::now();
        let mut callers = self.callers.write().await;

        // Keep the map from accumulating one entry per caller forever
        callers.retain(|_, hits| {
            prune_old(hits, now, self.window);
            !hits.is_empty()
        });

        let hits = callers.entry(caller.to_string()).or_default();
        if hits.len() >= self.max_requests {
            let retry_after_secs = hits
                .front()
                .map(|oldest| {
                    let elapsed = now.duration_since(*oldest);
                    self.window
                        .checked_sub(elapsed)
                        .unwrap_or(Duration::ZERO)
                        .as_secs()
                        .max(1)
                })
                .unwrap_or(1);
            return Decision::Limited { retry_after_secs };
        }

        hits.push_back(now);
        Decision::Allowed
    }
}

fn prune_old(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = hits.front() {
        if now.duration_since(*oldest) >= window {
            hits.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_limit_then_blocks() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert_eq!(limiter.check("cli-public").await, Decision::Allowed);
        }
        match limiter.check("cli-public").await {
            Decision::Limited { retry_after_secs } => assert!(retry_after_secs >= 1),
            Decision::Allowed => panic!("fourth request should be limited"),
        }
    }

    #[tokio::test]
    async fn test_callers_are_independent() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(60));

        assert_eq!(limiter.check("a").await, Decision::Allowed);
        assert_eq!(limiter.check("b").await, Decision::Allowed);
        assert!(matches!(limiter.check("a").await, Decision::Limited { .. }));
    }

    #[tokio::test]
    async fn test_window_elapse_frees_capacity() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_millis(50));

        assert_eq!(limiter.check("a").await, Decision::Allowed);
        assert!(matches!(limiter.check("a").await, Decision::Limited { .. }));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(limiter.check("a").await, Decision::Allowed);
    }
}
