//! Sliding-window request-rate governor.
//!
//! Windows are kept per `(client, limit)` pair so endpoints with different
//! budgets never share counters. State is process-wide and in-memory;
//! client cardinality is unbounded beyond lazy pruning, which is a known
//! scaling limit of the single-instance deployment. A multi-instance
//! deployment would put an external counter store behind the same surface.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A named request budget: at most `max_requests` within `window`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub name: &'static str,
    pub max_requests: usize,
    pub window: Duration,
}

/// In-process sliding-window limiter.
///
/// The prune-check-append sequence runs under one lock, so concurrent
/// requests from the same client cannot under-count.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<(String, String), Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the request is admitted. A rejected attempt is not
    /// recorded, so hammering a saturated window does not extend it.
    pub fn check(&self, client_id: &str, limit: &RateLimit) -> bool {
        self.check_at(client_id, limit, Instant::now())
    }

    fn check_at(&self, client_id: &str, limit: &RateLimit, now: Instant) -> bool {
        let mut windows = self.windows.lock();
        let timestamps = windows
            .entry((client_id.to_string(), limit.name.to_string()))
            .or_default();

        timestamps.retain(|t| now.duration_since(*t) < limit.window);

        if timestamps.len() >= limit.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: RateLimit = RateLimit {
        name: "test",
        max_requests: 3,
        window: Duration::from_secs(60),
    };

    #[test]
    fn test_rejects_above_budget() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("client", &LIMIT, now));
        }
        assert!(!limiter.check_at("client", &LIMIT, now));
    }

    #[test]
    fn test_window_expiry_readmits() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("client", &LIMIT, now));
        }
        assert!(!limiter.check_at("client", &LIMIT, now));

        let later = now + Duration::from_secs(61);
        assert!(limiter.check_at("client", &LIMIT, later));
    }

    #[test]
    fn test_rejection_is_not_recorded() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..3 {
            limiter.check_at("client", &LIMIT, now);
        }
        // Hammer the saturated window; these must not push the reset out.
        for i in 0..10 {
            assert!(!limiter.check_at("client", &LIMIT, now + Duration::from_secs(i)));
        }

        // First admitted timestamp ages out after the window, regardless of
        // the rejected attempts in between.
        assert!(limiter.check_at("client", &LIMIT, now + Duration::from_secs(61)));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("a", &LIMIT, now));
        }
        assert!(!limiter.check_at("a", &LIMIT, now));
        assert!(limiter.check_at("b", &LIMIT, now));
    }

    #[test]
    fn test_limits_do_not_share_counters() {
        let strict = RateLimit {
            name: "strict",
            max_requests: 1,
            window: Duration::from_secs(60),
        };
        let lax = RateLimit {
            name: "lax",
            max_requests: 5,
            window: Duration::from_secs(60),
        };

        let limiter = RateLimiter::new();
        let now = Instant::now();

        assert!(limiter.check_at("client", &strict, now));
        assert!(!limiter.check_at("client", &strict, now));
        // Same client, different limit name: separate window.
        assert!(limiter.check_at("client", &lax, now));
    }
}
