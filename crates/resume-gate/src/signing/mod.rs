//! Time-limited links to the private resume object.

mod s3;

pub use s3::S3LinkSigner;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gate_common::GateError;
use std::time::Duration;

/// A presigned URL, handed out once and never stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedResumeLink {
    pub url: String,
    pub expires_in: Duration,
    pub expires_at: DateTime<Utc>,
}

impl SignedResumeLink {
    pub fn new(url: String, expires_in: Duration) -> Self {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(expires_in).unwrap_or(chrono::Duration::zero());
        Self {
            url,
            expires_in,
            expires_at,
        }
    }
}

/// Mints a fresh link on every call
#[async_trait]
pub trait LinkSigner: Send + Sync {
    async fn presign(&self) -> Result<SignedResumeLink, GateError>;
}
