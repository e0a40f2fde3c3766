//! Service settings for the API service

use serde::Deserialize;

/// Room left in a request body for the JSON fields around an encoded image
const BODY_HEADROOM: usize = 64 * 1024;

/// Settings read from `FOODGRAM_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Address the HTTP server binds to
    pub bind_addr: String,
    /// Externally visible base URL, used for pagination links and short links
    pub public_url: String,
    /// Directory uploaded images are written to
    pub media_root: String,
    /// URL prefix uploaded images are served under
    pub media_url: String,
    /// Default page size
    pub page_size: u32,
    /// Upper bound for the `limit` query parameter
    pub max_page_size: u32,
    /// Lowest accepted cooking time in minutes
    pub min_cooking_time: i32,
    /// Highest accepted cooking time in minutes
    pub max_cooking_time: i32,
    /// Lowest accepted ingredient amount
    pub min_ingredient_amount: i32,
    /// Largest accepted decoded image
    pub max_image_bytes: usize,
    /// Apply migrations on startup
    pub run_migrations: bool,
}

impl ApiSettings {
    /// Load settings from the environment, falling back to defaults
    ///
    /// # Environment Variables
    /// - `FOODGRAM_BIND_ADDR` (default: "0.0.0.0:3001")
    /// - `FOODGRAM_PUBLIC_URL` (default: "http://localhost:3001")
    /// - `FOODGRAM_MEDIA_ROOT` (default: "media")
    /// - `FOODGRAM_MEDIA_URL` (default: "/media")
    /// - `FOODGRAM_PAGE_SIZE` (default: 6)
    /// - `FOODGRAM_MAX_PAGE_SIZE` (default: 100)
    /// - `FOODGRAM_MIN_COOKING_TIME` (default: 1)
    /// - `FOODGRAM_MAX_COOKING_TIME` (default: 1440)
    /// - `FOODGRAM_MIN_INGREDIENT_AMOUNT` (default: 1)
    /// - `FOODGRAM_MAX_IMAGE_BYTES` (default: 5 MiB)
    /// - `FOODGRAM_RUN_MIGRATIONS` (default: true)
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings: ApiSettings = config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:3001")?
            .set_default("public_url", "http://localhost:3001")?
            .set_default("media_root", "media")?
            .set_default("media_url", "/media")?
            .set_default("page_size", 6_i64)?
            .set_default("max_page_size", 100_i64)?
            .set_default("min_cooking_time", 1_i64)?
            .set_default("max_cooking_time", 1440_i64)?
            .set_default("min_ingredient_amount", 1_i64)?
            .set_default("max_image_bytes", 5_i64 * 1024 * 1024)?
            .set_default("run_migrations", true)?
            .add_source(config::Environment::with_prefix("FOODGRAM").try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.page_size == 0 || self.page_size > self.max_page_size {
            return Err(config::ConfigError::Message(format!(
                "page_size must be between 1 and max_page_size ({})",
                self.max_page_size
            )));
        }
        if self.min_cooking_time < 1 || self.min_cooking_time > self.max_cooking_time {
            return Err(config::ConfigError::Message(
                "cooking time bounds must satisfy 1 <= min <= max".to_string(),
            ));
        }
        if self.min_ingredient_amount < 1 {
            return Err(config::ConfigError::Message(
                "min_ingredient_amount must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Largest accepted request body
    ///
    /// Fits a base64 data URI of `max_image_bytes` plus the other fields.
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes.div_ceil(3) * 4 + BODY_HEADROOM
    }

    /// Public URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            public_url: "http://localhost:3001".to_string(),
            media_root: "media".to_string(),
            media_url: "/media".to_string(),
            page_size: 6,
            max_page_size: 100,
            min_cooking_time: 1,
            max_cooking_time: 1440,
            min_ingredient_amount: 1,
            max_image_bytes: 5 * 1024 * 1024,
            run_migrations: true,
        }
    }
}
