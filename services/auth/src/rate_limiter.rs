//! Rate limiter for failed login attempts
//!
//! Only failures count. A key that reaches `max_attempts` failures within
//! `window_seconds` is locked out for `ban_duration_seconds`; a successful
//! login clears its history. Entries whose window and ban have both lapsed
//! are swept once the table grows past `SWEEP_THRESHOLD` keys.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const SWEEP_THRESHOLD: usize = 1024;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of failed attempts allowed
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    /// Failed attempts in the current window
    failures: u32,
    /// Start of the current window
    window_start: Instant,
    /// Ban expiration time
    ban_expires: Option<Instant>,
}

impl RateLimiterEntry {
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        let window_over = now.duration_since(self.window_start) >= window;
        let ban_over = self.ban_expires.is_none_or(|expires| now >= expires);
        window_over && ban_over
    }
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check whether a key may attempt to log in
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let Some(ban_expires) = entries.get(key).map(|entry| entry.ban_expires) else {
            return true;
        };

        match ban_expires {
            Some(ban_expires) if now < ban_expires => false,
            Some(_) => {
                entries.remove(key);
                true
            }
            None => true,
        }
    }

    /// Record a failed attempt, banning the key once the limit is reached
    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        if entries.len() >= SWEEP_THRESHOLD {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_stale(now, window));
            debug!("Swept {} stale rate limiter entries", before - entries.len());
        }

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            failures: 0,
            window_start: now,
            ban_expires: None,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.failures = 0;
            entry.window_start = now;
        }

        entry.failures += 1;

        if entry.failures >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
        }
    }

    /// Forget a key after a successful login
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32, window_seconds: u64, ban_duration_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds,
            ban_duration_seconds,
        })
    }

    #[tokio::test]
    async fn bans_after_max_failures() {
        let limiter = limiter(3, 300, 3600);

        for _ in 0..2 {
            limiter.record_failure("a@example.com").await;
            assert!(limiter.is_allowed("a@example.com").await);
        }

        limiter.record_failure("a@example.com").await;
        assert!(!limiter.is_allowed("a@example.com").await);
        assert!(limiter.is_allowed("b@example.com").await);
    }

    #[tokio::test]
    async fn reset_clears_failures() {
        let limiter = limiter(2, 300, 3600);

        limiter.record_failure("a@example.com").await;
        limiter.reset("a@example.com").await;
        limiter.record_failure("a@example.com").await;

        assert!(limiter.is_allowed("a@example.com").await);
    }

    #[tokio::test]
    async fn ban_expires() {
        let limiter = limiter(1, 300, 0);

        limiter.record_failure("a@example.com").await;
        assert!(limiter.is_allowed("a@example.com").await);
    }

    #[tokio::test]
    async fn failures_outside_window_do_not_accumulate() {
        let limiter = limiter(2, 0, 3600);

        limiter.record_failure("a@example.com").await;
        limiter.record_failure("a@example.com").await;
        assert!(limiter.is_allowed("a@example.com").await);
    }

    #[tokio::test]
    async fn stale_entries_are_swept() {
        let limiter = limiter(1, 0, 0);

        for i in 0..SWEEP_THRESHOLD * 4 {
            limiter.record_failure(&format!("user{}@example.com", i)).await;
        }

        assert!(limiter.entries.lock().await.len() <= SWEEP_THRESHOLD);
    }

    #[tokio::test]
    async fn active_bans_survive_a_sweep() {
        let limiter = limiter(1, 300, 3600);

        limiter.record_failure("banned@example.com").await;
        for i in 0..SWEEP_THRESHOLD {
            limiter.record_failure(&format!("user{}@example.com", i)).await;
        }

        assert!(!limiter.is_allowed("banned@example.com").await);
        assert_eq!(limiter.entries.lock().await.len(), SWEEP_THRESHOLD + 1);
    }

    #[test]
    fn default_config() {
        let limiter = RateLimiter::new(RateLimiterConfig::default());
        assert_eq!(limiter.config().max_attempts, 5);
        assert_eq!(limiter.config().window_seconds, 300);
    }
}
