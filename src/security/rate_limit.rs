//! Token bucket rate limiting per endpoint and client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::schema::RateConfig;
use crate::error::{ErrorKind, GatewayError};
use crate::observability::metrics;

/// Checks between sweeps of idle buckets.
const SWEEP_EVERY: u64 = 256;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    /// From this instant the bucket is full again, same as a fresh one.
    full_at: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        let now = Instant::now();
        Self {
            tokens: capacity,
            last_update: now,
            full_at: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        let acquired = if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        };
        let missing = (capacity - self.tokens).max(0.0);
        self.full_at = now + Duration::from_secs_f64(missing / refill_rate);
        acquired
    }
}

/// Buckets keyed by `endpoint|client`.
///
/// Lives outside the reloadable runtime so buckets survive a config swap;
/// a changed rate applies to existing buckets on their next acquire.
/// Idle buckets are swept every few hundred checks; a full bucket is
/// indistinguishable from a fresh one, so dropping it loses nothing.
#[derive(Default)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every bucket that has refilled completely. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.full_at > now);
        before - buckets.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take one token for `client` on `endpoint`. A zero capacity disables limiting.
    pub fn check(&self, endpoint: &str, client: &str, rate: &RateConfig) -> Result<(), GatewayError> {
        if rate.capacity == 0 {
            return Ok(());
        }

        let capacity = rate.capacity as f64;
        let every_secs = (rate.every_ms.max(1) as f64) / 1000.0;
        let refill_rate = capacity / every_secs;

        let checks = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if checks % SWEEP_EVERY == 0 {
            let dropped = self.prune();
            tracing::debug!(dropped, "Swept idle rate limit buckets");
        }

        let key = format!("{}|{}", endpoint, client);
        let mut buckets = self.lock();
        let bucket = buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(capacity));
        let acquired = bucket.try_acquire(capacity, refill_rate);
        drop(buckets);

        if acquired {
            Ok(())
        } else {
            tracing::warn!(endpoint = %endpoint, client = %client, "Rate limit exceeded");
            metrics::record_rate_limited(endpoint);
            Err(GatewayError::new(
                ErrorKind::TooManyRequests,
                "too many requests, try again later",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(capacity: u32, every_ms: u64) -> RateConfig {
        RateConfig { capacity, every_ms }
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = RateLimiter::new();
        let rate = rate(2, 60_000);

        assert!(limiter.check("GET /a", "10.0.0.1", &rate).is_ok());
        assert!(limiter.check("GET /a", "10.0.0.1", &rate).is_ok());

        let err = limiter.check("GET /a", "10.0.0.1", &rate).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooManyRequests);
    }

    #[test]
    fn test_buckets_are_per_endpoint_and_client() {
        let limiter = RateLimiter::new();
        let rate = rate(1, 60_000);

        assert!(limiter.check("GET /a", "10.0.0.1", &rate).is_ok());
        assert!(limiter.check("GET /a", "10.0.0.2", &rate).is_ok());
        assert!(limiter.check("GET /b", "10.0.0.1", &rate).is_ok());
        assert!(limiter.check("GET /a", "10.0.0.1", &rate).is_err());
    }

    #[test]
    fn test_zero_capacity_is_unlimited() {
        let limiter = RateLimiter::new();
        for _ in 0..100 {
            assert!(limiter.check("GET /a", "c", &rate(0, 1000)).is_ok());
        }
    }

    #[test]
    fn test_prune_drops_refilled_buckets() {
        let limiter = RateLimiter::new();
        let fast = rate(1, 10);

        for client in 0..100 {
            assert!(limiter.check("GET /a", &client.to_string(), &fast).is_ok());
        }
        assert!(limiter.check("GET /slow", "c", &rate(1, 60_000)).is_ok());
        assert_eq!(limiter.len(), 101);

        std::thread::sleep(std::time::Duration::from_millis(30));

        assert_eq!(limiter.prune(), 100);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_checks_sweep_idle_buckets() {
        let limiter = RateLimiter::new();
        let rate = rate(1, 5);

        for client in 0..200 {
            assert!(limiter.check("GET /a", &client.to_string(), &rate).is_ok());
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
        for _ in 0..SWEEP_EVERY {
            let _ = limiter.check("GET /a", "steady", &rate);
        }

        assert!(limiter.len() < 200);
    }

    #[test]
    fn test_refill() {
        let limiter = RateLimiter::new();
        let rate = rate(1, 20);

        assert!(limiter.check("GET /a", "c", &rate).is_ok());
        assert!(limiter.check("GET /a", "c", &rate).is_err());
        std::thread::sleep(std::time::Duration::from_millis(40));
        assert!(limiter.check("GET /a", "c", &rate).is_ok());
    }
}
