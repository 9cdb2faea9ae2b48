//! Per-IP fixed-window rate limiter for the submission path.
//!
//! Counters live in process memory behind a mutex; the check-and-increment
//! is a single critical section, so concurrent submissions from one IP
//! cannot both sneak under the limit. Windows reset lazily when a request
//! arrives after expiry.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

struct WindowCounter {
    window_start: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client IP.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    counters: Mutex<HashMap<IpAddr, WindowCounter>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_seconds),
            max_requests: config.max_requests,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Records one request from `ip` and reports whether it exceeded the
    /// limit.
    ///
    /// Returns `true` when this request is the `max_requests + 1`th (or
    /// later) within the current window. The first request after a window
    /// expires resets the counter to 1. Check and increment happen under one
    /// lock acquisition.
    pub fn check_and_increment(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());

        let counter = counters.entry(ip).or_insert(WindowCounter {
            window_start: now,
            count: 0,
        });
        if now.duration_since(counter.window_start) >= self.window {
            counter.window_start = now;
            counter.count = 0;
        }
        counter.count = counter.count.saturating_add(1);

        let limited = counter.count > self.max_requests;
        if limited {
            log::info!(
                "Rate limit exceeded for {ip}: {} requests in window (max {})",
                counter.count,
                self.max_requests
            );
        }
        limited
    }

    /// Drops counters whose window has fully elapsed. Callers may invoke
    /// this periodically to bound memory on long-running processes.
    pub fn prune_expired(&self) {
        let now = Instant::now();
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.retain(|_, c| now.duration_since(c.window_start) < self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(window_seconds: u64, max_requests: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            window_seconds,
            max_requests,
        })
    }

    #[test]
    fn test_allows_up_to_max_then_blocks() {
        let limiter = limiter(3600, 3);
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        assert!(!limiter.check_and_increment(ip));
        assert!(!limiter.check_and_increment(ip));
        assert!(!limiter.check_and_increment(ip));
        assert!(limiter.check_and_increment(ip));
        assert!(limiter.check_and_increment(ip));
    }

    #[test]
    fn test_counters_are_per_ip() {
        let limiter = limiter(3600, 1);
        let a: IpAddr = "8.8.8.8".parse().unwrap();
        let b: IpAddr = "1.1.1.1".parse().unwrap();
        assert!(!limiter.check_and_increment(a));
        assert!(limiter.check_and_increment(a));
        assert!(!limiter.check_and_increment(b));
    }

    #[test]
    fn test_window_expiry_resets_counter() {
        let limiter = limiter(0, 1);
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        // Zero-length window: every request starts a fresh window.
        assert!(!limiter.check_and_increment(ip));
        assert!(!limiter.check_and_increment(ip));
    }

    #[test]
    fn test_prune_removes_expired_counters() {
        let limiter = limiter(0, 3);
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        limiter.check_and_increment(ip);
        limiter.prune_expired();
        let counters = limiter.counters.lock().unwrap();
        assert!(counters.is_empty());
    }

    #[test]
    fn test_concurrent_requests_never_undercount() {
        use std::sync::Arc;
        use std::thread;

        let limiter = Arc::new(limiter(3600, 3));
        let ip: IpAddr = "8.8.8.8".parse().unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                thread::spawn(move || limiter.check_and_increment(ip))
            })
            .collect();
        let limited = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&l| l)
            .count();
        // Exactly 3 of 8 pass regardless of interleaving.
        assert_eq!(limited, 5);
    }
}
