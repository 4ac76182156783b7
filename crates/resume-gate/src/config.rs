//! Configuration management for the resume gate.

use anyhow::{Context, Result, bail};
use axum::http::HeaderValue;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use gate_common::constants::{
    DEFAULT_ALLOWED_ORIGIN, DEFAULT_AWS_REGION, DEFAULT_LISTEN_ADDR, DEFAULT_REDIS_URL,
    DEFAULT_RESUME_KEY, MAX_LINK_TTL_SECS, RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_SWEEP_INTERVAL_SECS,
    RATE_LIMIT_WINDOW_SECS, RESUME_LINK_TTL_SECS, TURNSTILE_VERIFY_URL,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Value of `Access-Control-Allow-Origin`
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Challenge verification configuration
    #[serde(default)]
    pub turnstile: TurnstileConfig,

    /// Resume object configuration
    #[serde(default)]
    pub resume: ResumeConfig,
}

/// Where rate-limit counters live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// Per-process table. Quota is per instance.
    Memory,
    /// Shared counters in Redis
    Redis,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_backend")]
    pub backend: RateLimitBackend,

    /// Requests allowed per caller per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds
    #[serde(default = "default_window")]
    pub window_secs: u64,

    /// How often expired records are swept (memory backend)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Redis connection URL (redis backend)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            max_requests: default_max_requests(),
            window_secs: default_window(),
            sweep_interval_secs: default_sweep_interval(),
            redis_url: default_redis_url(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Challenge provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TurnstileConfig {
    /// Server-held secret. Missing secret fails requests with a 500.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// siteverify endpoint
    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    /// Outbound request timeout. None leaves it to the network stack.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            verify_url: default_verify_url(),
            timeout_secs: None,
        }
    }
}

/// Private resume object configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ResumeConfig {
    /// Bucket name. Missing bucket fails requests with a 500.
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default = "default_resume_key")]
    pub key: String,

    /// Signed link lifetime in seconds
    #[serde(default = "default_link_ttl")]
    pub link_ttl_secs: u64,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: default_region(),
            key: default_resume_key(),
            link_ttl_secs: default_link_ttl(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_allowed_origin() -> String { DEFAULT_ALLOWED_ORIGIN.to_string() }
fn default_backend() -> RateLimitBackend { RateLimitBackend::Memory }
fn default_max_requests() -> u32 { RATE_LIMIT_MAX_REQUESTS }
fn default_window() -> u64 { RATE_LIMIT_WINDOW_SECS }
fn default_sweep_interval() -> u64 { RATE_LIMIT_SWEEP_INTERVAL_SECS }
fn default_redis_url() -> String { DEFAULT_REDIS_URL.to_string() }
fn default_verify_url() -> String { TURNSTILE_VERIFY_URL.to_string() }
fn default_region() -> String { DEFAULT_AWS_REGION.to_string() }
fn default_resume_key() -> String { DEFAULT_RESUME_KEY.to_string() }
fn default_link_ttl() -> u64 { RESUME_LINK_TTL_SECS }

impl AppConfig {
    /// Load configuration from file, with CLI/env overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(ref listen) = args.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(ref origin) = args.allowed_origin {
            config.allowed_origin = origin.clone();
        }
        if let Some(ref redis_url) = args.redis_url {
            config.rate_limit.redis_url = redis_url.clone();
        }
        if let Some(ref secret) = args.turnstile_secret {
            config.turnstile.secret_key = Some(secret.clone());
        }
        if let Some(ref bucket) = args.bucket {
            config.resume.bucket = Some(bucket.clone());
        }
        if let Some(ref region) = args.region {
            config.resume.region = region.clone();
        }
        if let Some(ref key) = args.resume_key {
            config.resume.key = key.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run correctly with
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limit;
        if rl.max_requests == 0 {
            bail!("rate_limit.max_requests must be at least 1");
        }
        if rl.window_secs == 0 {
            bail!("rate_limit.window_secs must be at least 1");
        }
        if rl.backend == RateLimitBackend::Memory
            && (rl.sweep_interval_secs == 0 || rl.sweep_interval_secs >= rl.window_secs)
        {
            bail!(
                "rate_limit.sweep_interval_secs ({}) must be non-zero and shorter than window_secs ({})",
                rl.sweep_interval_secs,
                rl.window_secs
            );
        }
        if self.resume.link_ttl_secs == 0 || self.resume.link_ttl_secs > MAX_LINK_TTL_SECS {
            bail!(
                "resume.link_ttl_secs ({}) must be between 1 and {}",
                self.resume.link_ttl_secs,
                MAX_LINK_TTL_SECS
            );
        }
        HeaderValue::from_str(&self.allowed_origin)
            .with_context(|| format!("allowed_origin {:?} is not a valid header value", self.allowed_origin))?;

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            allowed_origin: default_allowed_origin(),
            rate_limit: RateLimitConfig::default(),
            turnstile: TurnstileConfig::default(),
            resume: ResumeConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert_ok!(config.validate());
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(900));
        assert_eq!(config.resume.link_ttl_secs, 300);
        assert_eq!(config.resume.key, "resume.pdf");
        assert_eq!(config.allowed_origin, "*");
        assert!(config.turnstile.secret_key.is_none());
    }

    #[test]
    fn test_sweep_must_be_shorter_than_window() {
        let mut config = AppConfig::default();
        config.rate_limit.sweep_interval_secs = config.rate_limit.window_secs;
        assert_err!(config.validate());

        // Redis expires keys itself, no sweep involved
        config.rate_limit.backend = RateLimitBackend::Redis;
        assert_ok!(config.validate());
    }

    #[test]
    fn test_rejects_bad_origin_and_zero_quota() {
        let mut config = AppConfig::default();
        config.allowed_origin = "https://example.com\n".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.rate_limit.max_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_link_ttl_bounds() {
        let mut config = AppConfig::default();

        config.resume.link_ttl_secs = 0;
        assert_err!(config.validate());

        config.resume.link_ttl_secs = MAX_LINK_TTL_SECS;
        assert_ok!(config.validate());

        config.resume.link_ttl_secs = MAX_LINK_TTL_SECS + 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("link_ttl_secs"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                allowed_origin = "https://portfolio.example"

                [rate_limit]
                backend = "redis"

                [resume]
                bucket = "private-docs"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.allowed_origin, "https://portfolio.example");
        assert_eq!(config.rate_limit.backend, RateLimitBackend::Redis);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.resume.bucket.as_deref(), Some("private-docs"));
        assert_eq!(config.resume.region, "us-east-1");
    }
}
