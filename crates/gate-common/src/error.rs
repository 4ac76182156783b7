//! Common error types for the resume gate.

use thiserror::Error;

use crate::constants::messages;

/// Errors surfaced by the verification service
#[derive(Debug, Error)]
pub enum GateError {
    /// Malformed body or missing/wrong-typed token
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller exceeded the request quota
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Challenge provider rejected the token, or could not be reached
    #[error("Verification failed")]
    VerificationFailed,

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis connection/operation error
    #[error("Redis error: {0}")]
    Redis(String),

    /// Presigned URL generation error
    #[error("Signing error: {0}")]
    Signing(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::VerificationFailed => 403,
            Self::RateLimited { .. } => 429,
            Self::Config(_) | Self::Redis(_) | Self::Signing(_) | Self::Internal(_) => 500,
        }
    }

    /// Message safe to return to the caller. Internal detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => messages::INVALID_TOKEN,
            Self::VerificationFailed => messages::VERIFICATION_FAILED,
            Self::RateLimited { .. } => messages::RATE_LIMITED,
            Self::Config(_) | Self::Redis(_) | Self::Signing(_) | Self::Internal(_) => {
                messages::INTERNAL
            }
        }
    }

    /// Returns true for failures the operator has to look at
    pub fn is_server_fault(&self) -> bool {
        self.status_code() >= 500
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_distinct() {
        assert_eq!(GateError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(GateError::VerificationFailed.status_code(), 403);
        assert_eq!(GateError::RateLimited { retry_after_secs: 1 }.status_code(), 429);
        assert_eq!(GateError::Internal("x".into()).status_code(), 500);
        assert_eq!(GateError::Config("x".into()).status_code(), 500);
    }

    #[test]
    fn test_internal_detail_not_public() {
        let err = GateError::Config("S3_BUCKET_NAME not configured".into());
        assert!(err.is_server_fault());
        assert!(!err.public_message().contains("S3_BUCKET_NAME"));
        assert_eq!(err.public_message(), messages::INTERNAL);
    }
}
