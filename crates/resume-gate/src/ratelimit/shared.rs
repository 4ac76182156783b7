//! Shared fixed-window limiter backed by Redis counters.

use async_trait::async_trait;
use gate_common::GateError;
use gate_common::constants::redis_keys::RATELIMIT_PREFIX;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

use super::{FixedWindow, RateDecision, RateLimitStore};

/// TTL reply for a key that exists without an expiry
const TTL_PERSISTENT: i64 = -1;

/// Fixed-window limiter shared by every instance pointed at the same Redis.
///
/// The window starts at the first attempt: `SET NX EX` creates the counter
/// with its expiry and `INCR` bumps it, both inside one `MULTI`/`EXEC`, so a
/// counter never exists without a TTL. The key disappears when the window ends.
pub struct RedisRateLimiter {
    redis: ConnectionManager,
    policy: FixedWindow,
}

impl RedisRateLimiter {
    pub fn new(redis: ConnectionManager, policy: FixedWindow) -> Self {
        Self { redis, policy }
    }

    fn window_secs(&self) -> u64 {
        self.policy.window.as_secs().max(1)
    }
}

pub(crate) fn counter_key(caller: &str) -> String {
    format!("{}{}", RATELIMIT_PREFIX, caller)
}

/// Retry delay for a limited caller from the counter's TTL reply
fn retry_after_from_ttl(ttl: i64, window: Duration) -> Duration {
    if ttl > 0 {
        Duration::from_secs(ttl as u64)
    } else {
        window
    }
}

fn redis_err(e: redis::RedisError) -> GateError {
    GateError::Redis(e.to_string())
}

#[async_trait]
impl RateLimitStore for RedisRateLimiter {
    async fn check(&self, caller: &str) -> Result<RateDecision, GateError> {
        let key = counter_key(caller);
        let window_secs = self.window_secs();
        let mut conn = self.redis.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET")
            .arg(&key)
            .arg(0)
            .arg("EX")
            .arg(window_secs)
            .arg("NX")
            .ignore()
            .incr(&key, 1);
        let (count,): (u32,) = pipe.query_async(&mut conn).await.map_err(redis_err)?;

        if count <= self.policy.max_requests {
            return Ok(RateDecision::Allowed {
                remaining: self.policy.max_requests - count,
            });
        }

        let ttl: i64 = conn.ttl(&key).await.map_err(redis_err)?;
        if ttl == TTL_PERSISTENT {
            // Counter left without an expiry (e.g. written by an older release)
            tracing::warn!("Rate-limit counter had no expiry, restoring window");
            conn.expire::<_, ()>(&key, window_secs as i64)
                .await
                .map_err(redis_err)?;
        }

        Ok(RateDecision::Limited {
            retry_after: retry_after_from_ttl(ttl, self.policy.window),
        })
    }
}
