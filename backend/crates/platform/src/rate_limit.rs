//! Rate Limiting Infrastructure
//!
//! Common rate limiting abstractions plus the in-memory fixed-window
//! implementation used by the gate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Rate limit check result
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    /// Seconds until the window resets, rounded up, never negative
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        ((self.reset_at_ms - now_ms).max(0) as u64).div_ceil(1000)
    }
}

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Check and increment rate limit counter
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>>;
}

/// Per-key fixed-window state
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    window_start_ms: i64,
}

/// In-memory fixed-window rate limiter
///
/// One counter and window start per key. The read-modify-write for a key
/// happens under a single lock acquisition, so two concurrent requests
/// can never both observe the pre-increment count. A poisoned lock is
/// recovered: each update is small and either applied or not.
#[derive(Debug, Clone, Default)]
pub struct MemoryRateLimitStore {
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked
    pub fn tracked(&self) -> usize {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop windows whose last window started more than `max_idle` ago
    ///
    /// Returns the number of windows removed. Stale windows are harmless
    /// for correctness (they reset on the next request); this only bounds
    /// memory growth.
    pub fn sweep_stale(&self, max_idle: Duration) -> usize {
        let now_ms = now_ms();
        let cutoff = now_ms - max_idle.as_millis() as i64;
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|_, w| w.window_start_ms >= cutoff);
        before - windows.len()
    }

    fn check_at(&self, key: &str, config: &RateLimitConfig, now_ms: i64) -> RateLimitResult {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            window_start_ms: now_ms,
        });

        // Window elapsed: reset before counting this request
        if now_ms - window.window_start_ms >= config.window_ms() {
            window.count = 0;
            window.window_start_ms = now_ms;
        }

        window.count = window.count.saturating_add(1);
        let allowed = window.count <= config.max_requests;

        RateLimitResult {
            allowed,
            remaining: config.max_requests.saturating_sub(window.count),
            reset_at_ms: window.window_start_ms + config.window_ms(),
        }
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.check_at(key, config, now_ms()))
    }
}

/// Current Unix time in milliseconds
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_max_requests_allowed() {
        let store = MemoryRateLimitStore::new();
        let config = RateLimitConfig::new(3, 60);
        let t0 = 1_000_000;

        for i in 1..=3 {
            let result = store.check_at("10.0.0.1", &config, t0);
            assert!(result.allowed, "request {i} should be allowed");
            assert_eq!(result.remaining, 3 - i);
        }

        let result = store.check_at("10.0.0.1", &config, t0);
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn test_window_reset() {
        let store = MemoryRateLimitStore::new();
        let config = RateLimitConfig::new(1, 60);
        let t0 = 1_000_000;

        assert!(store.check_at("k", &config, t0).allowed);
        assert!(!store.check_at("k", &config, t0 + 59_999).allowed);
        // One window-duration later the counter starts fresh
        assert!(store.check_at("k", &config, t0 + 60_000).allowed);
    }

    #[test]
    fn test_keys_independent() {
        let store = MemoryRateLimitStore::new();
        let config = RateLimitConfig::new(1, 60);
        let t0 = 0;

        assert!(store.check_at("a", &config, t0).allowed);
        assert!(!store.check_at("a", &config, t0).allowed);
        assert!(store.check_at("b", &config, t0).allowed);
    }

    #[test]
    fn test_reset_at() {
        let store = MemoryRateLimitStore::new();
        let config = RateLimitConfig::new(5, 60);
        let t0 = 500;

        let result = store.check_at("k", &config, t0);
        assert_eq!(result.reset_at_ms, t0 + 60_000);
        assert_eq!(result.retry_after_secs(t0), 60);
    }

    #[test]
    fn test_sweep_stale() {
        let store = MemoryRateLimitStore::new();
        let config = RateLimitConfig::new(5, 1);

        // A window started "now" survives any reasonable idle cutoff
        let _ = store.check_at("fresh", &config, now_ms());
        assert_eq!(store.tracked(), 1);
        assert_eq!(store.sweep_stale(Duration::from_secs(3600)), 0);

        // A window started far in the past is removed
        let _ = store.check_at("stale", &config, now_ms() - 10_000_000);
        assert_eq!(store.tracked(), 2);
        assert_eq!(store.sweep_stale(Duration::from_secs(3600)), 1);
        assert_eq!(store.tracked(), 1);
    }

    #[test]
    fn test_poisoned_lock_recovers() {
        let store = MemoryRateLimitStore::new();
        let config = RateLimitConfig::new(3, 60);
        let _ = store.check_at("k", &config, 0);

        let windows = store.windows.clone();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = windows.lock().unwrap();
            panic!("poison the window table");
        }));
        assert!(store.windows.is_poisoned());

        // Counting continues where it left off
        let result = store.check_at("k", &config, 0);
        assert!(result.allowed);
        assert_eq!(result.remaining, 1);
        assert_eq!(store.tracked(), 1);
    }

    #[tokio::test]
    async fn test_store_trait() {
        let store = MemoryRateLimitStore::new();
        let config = RateLimitConfig::new(2, 60);

        let result = RateLimitStore::check_and_increment(&store, "k", &config)
            .await
            .unwrap();
        assert!(result.allowed);
        assert_eq!(result.remaining, 1);
    }
}
