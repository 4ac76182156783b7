//! Health check endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::state::{AppState, StatsSnapshot};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    redis: bool,
}

/// Readiness check (is the shared rate-limit store reachable?)
pub async fn ready_check(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, StatusCode> {
    if state.redis_healthy().await {
        Ok(Json(ReadyResponse {
            status: "ready",
            redis: state.redis.is_some(),
        }))
    } else {
        // Return 503 if not ready
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[derive(Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    counters: StatsSnapshot,
    /// Callers with a live rate-limit record (memory backend only)
    tracked_callers: Option<usize>,
}

/// Metrics endpoint (for monitoring)
pub async fn metrics(
    State(state): State<AppState>,
) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        counters: state.stats.snapshot(),
        tracked_callers: state.rate_limiter.tracked_callers().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::ratelimit::{FixedWindow, MemoryRateLimiter, RateLimitStore};
    use crate::routes::create_router;
    use crate::signing::S3LinkSigner;
    use crate::challenge::TurnstileVerifier;
    use axum::{body::Body, http::Request};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn state() -> (AppState, Arc<MemoryRateLimiter>) {
        let config = AppConfig::default();
        let limiter = Arc::new(MemoryRateLimiter::new(FixedWindow::new(5, Duration::from_secs(900))));
        let verifier = Arc::new(TurnstileVerifier::new(&config.turnstile).unwrap());
        let sdk = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        let signer = Arc::new(S3LinkSigner::new(aws_sdk_s3::Client::from_conf(sdk), &config.resume));
        let state = AppState::new(config, None, limiter.clone(), verifier, signer);
        (state, limiter)
    }

    async fn get_json(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = create_router(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_and_ready_without_redis() {
        let (state, _) = state().await;

        let (status, body) = get_json(state.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = get_json(state, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["redis"], false);
    }

    #[tokio::test]
    async fn test_metrics_reports_tracked_callers() {
        let (state, limiter) = state().await;
        limiter.check("192.0.2.1").await.unwrap();
        limiter.check("192.0.2.2").await.unwrap();

        let (status, body) = get_json(state, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tracked_callers"], 2);
        assert_eq!(body["requests"], 0);
    }
}
