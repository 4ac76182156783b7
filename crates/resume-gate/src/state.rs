//! Application state and shared resources.

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::challenge::{ChallengeVerifier, TurnstileVerifier};
use crate::config::{AppConfig, RateLimitBackend};
use crate::ratelimit::{FixedWindow, MemoryRateLimiter, RateLimitStore, RedisRateLimiter};
use crate::signing::{LinkSigner, S3LinkSigner};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Redis connection manager, present only with the redis rate-limit backend
    pub redis: Option<ConnectionManager>,

    /// Rate-limit backend consulted on every verify request
    pub rate_limiter: Arc<dyn RateLimitStore>,

    /// Challenge token verifier
    pub verifier: Arc<dyn ChallengeVerifier>,

    /// Resume link signer
    pub signer: Arc<dyn LinkSigner>,

    /// Request counters
    pub stats: Arc<GateStats>,
}

/// Runtime statistics
#[derive(Default)]
pub struct GateStats {
    /// Verify requests received (preflights excluded)
    pub requests: AtomicU64,
    /// Requests refused by the rate limiter
    pub throttled: AtomicU64,
    /// Requests with a missing or malformed token
    pub invalid_input: AtomicU64,
    /// Tokens the provider did not accept
    pub verification_failed: AtomicU64,
    /// Signed links handed out
    pub links_issued: AtomicU64,
    /// Requests that ended in a 500
    pub internal_errors: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub throttled: u64,
    pub invalid_input: u64,
    pub verification_failed: u64,
    pub links_issued: u64,
    pub internal_errors: u64,
}

impl GateStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            invalid_input: self.invalid_input.load(Ordering::Relaxed),
            verification_failed: self.verification_failed.load(Ordering::Relaxed),
            links_issued: self.links_issued.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
        }
    }
}

impl AppState {
    /// Assemble state from already-built collaborators
    pub fn new(
        config: AppConfig,
        redis: Option<ConnectionManager>,
        rate_limiter: Arc<dyn RateLimitStore>,
        verifier: Arc<dyn ChallengeVerifier>,
        signer: Arc<dyn LinkSigner>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            redis,
            rate_limiter,
            verifier,
            signer,
            stats: Arc::new(GateStats::default()),
        }
    }

    /// Build production state. Returns the memory limiter too so the caller
    /// can drive its sweep lifecycle.
    pub async fn from_config(config: AppConfig) -> Result<(Self, Option<Arc<MemoryRateLimiter>>)> {
        let rl = &config.rate_limit;
        let policy = FixedWindow::new(rl.max_requests, rl.window());

        let mut memory = None;
        let mut redis = None;
        let rate_limiter: Arc<dyn RateLimitStore> = match rl.backend {
            RateLimitBackend::Memory => {
                let limiter = Arc::new(MemoryRateLimiter::new(policy));
                memory = Some(limiter.clone());
                limiter
            }
            RateLimitBackend::Redis => {
                // Connect with connection manager (handles reconnection)
                let client = redis::Client::open(rl.redis_url.as_str())
                    .context("Failed to create Redis client")?;
                let conn = ConnectionManager::new(client)
                    .await
                    .context("Failed to connect to Redis")?;
                tracing::info!(url = %rl.redis_url, "✅ Redis connected");

                redis = Some(conn.clone());
                Arc::new(RedisRateLimiter::new(conn, policy))
            }
        };

        let verifier = Arc::new(
            TurnstileVerifier::new(&config.turnstile).context("Failed to build Turnstile client")?,
        );
        let signer = Arc::new(S3LinkSigner::from_env(&config.resume).await);

        Ok((Self::new(config, redis, rate_limiter, verifier, signer), memory))
    }

    /// Is the shared store reachable (always true without one)?
    pub async fn redis_healthy(&self) -> bool {
        let Some(redis) = &self.redis else {
            return true;
        };
        let mut conn = redis.clone();
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }
}
