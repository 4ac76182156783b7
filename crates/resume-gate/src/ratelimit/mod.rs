//! Fixed-window rate limiting keyed by caller address.
//!
//! Two backends share the same window semantics:
//! - `MemoryRateLimiter`: per-process table with a background sweep
//! - `RedisRateLimiter`: shared counters with key expiry
//!
//! The memory backend only enforces the quota per instance. Several instances
//! behind a load balancer each hand out their own quota.

mod memory;
mod shared;

pub use memory::MemoryRateLimiter;
pub use shared::RedisRateLimiter;

use async_trait::async_trait;
use gate_common::GateError;
use std::time::Duration;

/// Quota and window length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindow {
    pub max_requests: u32,
    pub window: Duration,
}

impl FixedWindow {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Attempt recorded
    Allowed { remaining: u32 },
    /// Quota exhausted until the window resets
    Limited { retry_after: Duration },
}

impl RateDecision {
    #[allow(dead_code)]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Backend that records attempts and decides whether to admit them
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Check the quota for `caller` and record the attempt if admitted
    async fn check(&self, caller: &str) -> Result<RateDecision, GateError>;

    /// Number of callers currently tracked, when the backend knows it
    async fn tracked_callers(&self) -> Option<usize> {
        None
    }
}
