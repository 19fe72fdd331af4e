//! Sliding-window rate limiter (spec §4.6 "Rate limit", §5 "Shared-resource
//! policy"). Grounded on the reference gateway's fixed-window limiter but
//! reworked to a true sliding window, since spec §8 requires that a
//! subject's bucket never retain timestamps older than 60 seconds.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-subject sliding-window request timestamps.
pub struct RateLimiter {
    windows: DashMap<String, Vec<Instant>>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Return `true` if the request from `key` is allowed, recording it if so.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);

        if entry.len() < self.max_requests as usize {
            entry.push(now);
            true
        } else {
            false
        }
    }

    /// Seconds until the oldest timestamp in `key`'s window expires, for the
    /// `Retry-After` / `details.retry_after_seconds` response field.
    pub fn retry_after_seconds(&self, key: &str) -> u64 {
        let Some(entry) = self.windows.get(key) else {
            return 0;
        };
        let Some(oldest) = entry.iter().min() else {
            return 0;
        };
        let elapsed = Instant::now().duration_since(*oldest);
        self.window.saturating_sub(elapsed).as_secs().max(1)
    }

    /// Evict subjects with no timestamps in-window. Call periodically.
    pub fn gc(&self) {
        let now = Instant::now();
        self.windows.retain(|_, timestamps| {
            timestamps.retain(|t| now.duration_since(*t) < self.window);
            !timestamps.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_max_requests_per_window() {
        let rl = RateLimiter::new(3, Duration::from_secs(60));
        assert!(rl.check("user"));
        assert!(rl.check("user"));
        assert!(rl.check("user"));
        assert!(!rl.check("user"));
    }

    #[test]
    fn different_subjects_are_independent() {
        let rl = RateLimiter::new(1, Duration::from_secs(60));
        assert!(rl.check("a"));
        assert!(!rl.check("a"));
        assert!(rl.check("b"));
    }

    #[test]
    fn window_never_retains_timestamps_older_than_its_duration() {
        let rl = RateLimiter::new(100, Duration::from_millis(10));
        rl.check("user");
        std::thread::sleep(Duration::from_millis(20));
        // triggers retain() internally; the stale timestamp must be gone
        rl.check("user");
        let entry = rl.windows.get("user").unwrap();
        assert_eq!(entry.len(), 1);
    }
}
