//! Service settings for the authentication service

use serde::Deserialize;

use crate::rate_limiter::RateLimiterConfig;

/// Settings read from `FOODGRAM_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Failed logins allowed inside one window
    pub login_max_attempts: u32,
    /// Window length in seconds
    pub login_window_seconds: u64,
    /// Lockout length in seconds once the limit is hit
    pub login_ban_seconds: u64,
}

impl AuthSettings {
    /// Load settings from the environment, falling back to defaults
    ///
    /// # Environment Variables
    /// - `FOODGRAM_BIND_ADDR` (default: "0.0.0.0:3000")
    /// - `FOODGRAM_LOGIN_MAX_ATTEMPTS` (default: 5)
    /// - `FOODGRAM_LOGIN_WINDOW_SECONDS` (default: 300)
    /// - `FOODGRAM_LOGIN_BAN_SECONDS` (default: 3600)
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:3000")?
            .set_default("login_max_attempts", 5_i64)?
            .set_default("login_window_seconds", 300_i64)?
            .set_default("login_ban_seconds", 3600_i64)?
            .add_source(config::Environment::with_prefix("FOODGRAM").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn rate_limiter(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_attempts: self.login_max_attempts,
            window_seconds: self.login_window_seconds,
            ban_duration_seconds: self.login_ban_seconds,
        }
    }
}
