//! Resume access endpoint: rate limit, verify the challenge token, sign a link.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use gate_common::constants::UNKNOWN_CALLER;
use gate_common::constants::headers::{X_FORWARDED_FOR, X_REAL_IP};
use gate_common::{ErrorResponse, GateError, ResumeLinkResponse};
use serde_json::Value;
use tracing::Instrument;

use crate::ratelimit::RateDecision;
use crate::state::{AppState, GateStats};

/// CORS preflight. Answered before any other processing.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Verify a challenge token and hand out a signed resume link
pub async fn request_resume(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ResumeLinkResponse>, ApiError> {
    let caller = caller_address(&headers);
    let span = tracing::info_span!(
        "resume_request",
        request_id = %generate_request_id(),
        caller = %fingerprint(&caller),
    );

    let result = process(&state, &caller, body).instrument(span).await;
    record_outcome(&state.stats, &result);

    result.map(Json).map_err(ApiError)
}

async fn process(
    state: &AppState,
    caller: &str,
    body: Result<Bytes, BytesRejection>,
) -> Result<ResumeLinkResponse, GateError> {
    match state.rate_limiter.check(caller).await? {
        RateDecision::Allowed { remaining } => {
            tracing::debug!(remaining, "Rate limit check passed");
        }
        RateDecision::Limited { retry_after } => {
            tracing::warn!(retry_after_secs = retry_after.as_secs(), "Rate limit exceeded");
            return Err(GateError::RateLimited {
                retry_after_secs: ceil_secs(retry_after),
            });
        }
    }

    let body = body.map_err(body_error)?;
    let token = parse_token(&body)?;

    if !state.verifier.verify(&token, caller).await? {
        tracing::info!("Challenge verification failed");
        return Err(GateError::VerificationFailed);
    }

    let link = state.signer.presign().await?;
    tracing::info!(expires_at = %link.expires_at, "Signed resume link issued");

    Ok(ResumeLinkResponse::new(link.url, link.expires_in.as_secs()))
}

fn record_outcome(stats: &GateStats, result: &Result<ResumeLinkResponse, GateError>) {
    GateStats::incr(&stats.requests);
    let counter = match result {
        Ok(_) => &stats.links_issued,
        Err(GateError::RateLimited { .. }) => &stats.throttled,
        Err(GateError::InvalidInput(_)) => &stats.invalid_input,
        Err(GateError::VerificationFailed) => &stats.verification_failed,
        Err(_) => &stats.internal_errors,
    };
    GateStats::incr(counter);
}

/// Client-side read failures (oversized or aborted body) are bad input
fn body_error(rejection: BytesRejection) -> GateError {
    if rejection.status().is_client_error() {
        GateError::InvalidInput(format!("unreadable body: {}", rejection.body_text()))
    } else {
        GateError::Internal(format!("failed to read body: {}", rejection.body_text()))
    }
}

/// Extract a non-empty string `token` from a JSON body. An empty body counts as `{}`.
fn parse_token(body: &[u8]) -> Result<String, GateError> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body)
            .map_err(|e| GateError::InvalidInput(format!("malformed JSON body: {e}")))?
    };

    match value.get("token") {
        Some(Value::String(token)) if !token.is_empty() => Ok(token.clone()),
        Some(_) => Err(GateError::InvalidInput("token must be a non-empty string".to_string())),
        None => Err(GateError::InvalidInput("token is missing".to_string())),
    }
}

/// Caller address: first `X-Forwarded-For` entry, then `X-Real-IP`, then `unknown`
pub fn caller_address(headers: &HeaderMap) -> String {
    let header_str = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header_str(X_FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_str(X_REAL_IP))
        .unwrap_or(UNKNOWN_CALLER)
        .to_string()
}

/// Short stable hash of the caller address for logs
fn fingerprint(caller: &str) -> String {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(caller.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..6])
}

/// Random id correlating the log lines of one request
fn generate_request_id() -> String {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use rand::Rng;

    let mut bytes = [0u8; 12];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn ceil_secs(d: std::time::Duration) -> u64 {
    let secs = d.as_secs() + u64::from(d.subsec_nanos() > 0);
    secs.max(1)
}

/// A `GateError` rendered as `{ "error": ... }` with its status code
#[derive(Debug)]
pub struct ApiError(pub GateError);

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.0.is_server_fault() {
            tracing::error!(error = %self.0, "Resume request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Resume request rejected");
        }

        let mut response = (status, Json(ErrorResponse::new(self.0.public_message()))).into_response();
        if let GateError::RateLimited { retry_after_secs } = self.0 {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
