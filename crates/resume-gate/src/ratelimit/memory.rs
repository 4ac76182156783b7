//! In-process fixed-window limiter with a periodic sweep of expired records.

use async_trait::async_trait;
use gate_common::GateError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use super::{FixedWindow, RateDecision, RateLimitStore};

/// Attempts seen from one caller in the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: Instant,
}

impl RateLimitRecord {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }
}

type RecordTable = Arc<Mutex<HashMap<String, RateLimitRecord>>>;

/// Running sweep task
struct Sweeper {
    shutdown: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

/// Per-process fixed-window limiter.
///
/// Constructed explicitly and owned by the application state. The sweep task
/// only runs between `start` and `stop`.
pub struct MemoryRateLimiter {
    policy: FixedWindow,
    records: RecordTable,
    sweeper: Mutex<Option<Sweeper>>,
}

impl MemoryRateLimiter {
    pub fn new(policy: FixedWindow) -> Self {
        Self {
            policy,
            records: Arc::new(Mutex::new(HashMap::new())),
            sweeper: Mutex::new(None),
        }
    }

    /// Check and record an attempt at an explicit point in time
    pub async fn check_at(&self, caller: &str, now: Instant) -> RateDecision {
        let mut records = self.records.lock().await;

        match records.get_mut(caller) {
            Some(record) if !record.is_expired(now) => {
                if record.count >= self.policy.max_requests {
                    return RateDecision::Limited {
                        retry_after: record.reset_at.saturating_duration_since(now),
                    };
                }
                record.count += 1;
                RateDecision::Allowed {
                    remaining: self.policy.max_requests - record.count,
                }
            }
            _ => {
                // Replace rather than mutate an expired record
                records.insert(
                    caller.to_string(),
                    RateLimitRecord::fresh(now, self.policy.window),
                );
                RateDecision::Allowed {
                    remaining: self.policy.max_requests.saturating_sub(1),
                }
            }
        }
    }

    /// Current record for a caller, if any
    #[allow(dead_code)]
    pub async fn record(&self, caller: &str) -> Option<RateLimitRecord> {
        self.records.lock().await.get(caller).copied()
    }

    /// Delete every record whose window has ended. Returns how many were removed.
    #[allow(dead_code)]
    pub async fn sweep_at(&self, now: Instant) -> usize {
        sweep_expired(&self.records, now).await
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    #[allow(dead_code)]
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Spawn the periodic sweep. Returns false if it is already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(&self, interval: Duration) -> bool {
        let mut sweeper = self.sweeper.lock().await;
        if sweeper.is_some() {
            return false;
        }

        let (shutdown, rx) = broadcast::channel(1);
        let handle = tokio::spawn(sweep_worker(self.records.clone(), interval, rx));
        *sweeper = Some(Sweeper { shutdown, handle });

        tracing::info!(interval_secs = interval.as_secs(), "Rate-limit sweep started");
        true
    }

    /// Stop the sweep task and wait for it to exit. Returns false if it was not running.
    pub async fn stop(&self) -> bool {
        let Some(sweeper) = self.sweeper.lock().await.take() else {
            return false;
        };

        let _ = sweeper.shutdown.send(());
        if let Err(e) = sweeper.handle.await {
            tracing::warn!(error = %e, "Rate-limit sweep task ended abnormally");
        }

        tracing::info!("Rate-limit sweep stopped");
        true
    }

    #[allow(dead_code)]
    pub async fn is_running(&self) -> bool {
        self.sweeper.lock().await.is_some()
    }
}

impl Drop for MemoryRateLimiter {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.get_mut().take() {
            sweeper.handle.abort();
        }
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimiter {
    async fn check(&self, caller: &str) -> Result<RateDecision, GateError> {
        Ok(self.check_at(caller, Instant::now()).await)
    }

    async fn tracked_callers(&self) -> Option<usize> {
        Some(self.len().await)
    }
}

async fn sweep_expired(records: &RecordTable, now: Instant) -> usize {
    let mut records = records.lock().await;
    let before = records.len();
    records.retain(|_, record| !record.is_expired(now));
    before - records.len()
}

/// Background sweep loop
async fn sweep_worker(records: RecordTable, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {
                let removed = sweep_expired(&records, Instant::now()).await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired rate-limit records");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> MemoryRateLimiter {
        MemoryRateLimiter::new(FixedWindow::new(5, Duration::from_secs(900)))
    }

    #[tokio::test]
    async fn test_sixth_request_in_window_is_limited() {
        let limiter = limiter();
        let t0 = Instant::now();

        for i in 0..5u32 {
            let at = t0 + Duration::from_secs(u64::from(i) * 60);
            assert_eq!(
                limiter.check_at("203.0.113.7", at).await,
                RateDecision::Allowed { remaining: 4 - i }
            );
        }

        let decision = limiter.check_at("203.0.113.7", t0 + Duration::from_secs(600)).await;
        assert_eq!(
            decision,
            RateDecision::Limited {
                retry_after: Duration::from_secs(300)
            }
        );
    }

    #[tokio::test]
    async fn test_callers_are_independent() {
        let limiter = limiter();
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.check_at("a", now).await.is_allowed());
        }
        assert!(!limiter.check_at("a", now).await.is_allowed());
        assert!(limiter.check_at("b", now).await.is_allowed());
    }

    #[tokio::test]
    async fn test_expired_window_grants_exactly_five_more() {
        let limiter = limiter();
        let t0 = Instant::now();

        for _ in 0..6 {
            limiter.check_at("a", t0).await;
        }
        assert!(!limiter.check_at("a", t0).await.is_allowed());

        let reset = limiter.record("a").await.unwrap().reset_at;
        for _ in 0..5 {
            assert!(limiter.check_at("a", reset).await.is_allowed());
        }
        assert!(!limiter.check_at("a", reset).await.is_allowed());

        let record = limiter.record("a").await.unwrap();
        assert_eq!(record.count, 5);
        assert_eq!(record.reset_at, reset + Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_limited_attempts_do_not_extend_window() {
        let limiter = limiter();
        let t0 = Instant::now();

        for _ in 0..5 {
            limiter.check_at("a", t0).await;
        }
        limiter.check_at("a", t0 + Duration::from_secs(899)).await;

        let record = limiter.record("a").await.unwrap();
        assert_eq!(record.count, 5);
        assert_eq!(record.reset_at, t0 + Duration::from_secs(900));
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let limiter = limiter();
        let t0 = Instant::now();

        limiter.check_at("old", t0).await;
        limiter.check_at("new", t0 + Duration::from_secs(600)).await;

        assert_eq!(limiter.sweep_at(t0 + Duration::from_secs(899)).await, 0);
        assert_eq!(limiter.sweep_at(t0 + Duration::from_secs(900)).await, 1);
        assert!(limiter.record("old").await.is_none());
        assert!(limiter.record("new").await.is_some());
        assert_eq!(limiter.len().await, 1);
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let limiter = limiter();
        assert!(!limiter.stop().await);

        assert!(limiter.start(Duration::from_millis(10)).await);
        assert!(limiter.is_running().await);
        assert!(!limiter.start(Duration::from_millis(10)).await);

        assert!(limiter.stop().await);
        assert!(!limiter.is_running().await);

        // Restartable after stop
        assert!(limiter.start(Duration::from_millis(10)).await);
        assert!(limiter.stop().await);
    }

    #[tokio::test]
    async fn test_background_sweep_purges_expired_records() {
        let limiter = MemoryRateLimiter::new(FixedWindow::new(5, Duration::from_millis(20)));
        limiter.check("a").await.unwrap();
        assert_eq!(limiter.tracked_callers().await, Some(1));

        limiter.start(Duration::from_millis(5)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        limiter.stop().await;

        assert!(limiter.is_empty().await);
    }
}
