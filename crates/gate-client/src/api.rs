//! HTTP access to the verification endpoint and the signed link.

use async_trait::async_trait;
use gate_common::VerifyRequest;
use serde::Deserialize;
use thiserror::Error;

use crate::state::GENERIC_FAILURE;

/// A link returned by a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedLink {
    pub resume_url: String,
    pub expires_in: u64,
}

/// Why a call did not produce what the flow needed
#[derive(Debug, Error)]
pub enum ApiFailure {
    #[error("verification endpoint is not configured")]
    NotConfigured,

    /// The service answered, but not with a link
    #[error("request rejected (HTTP {status})")]
    Rejected { status: u16, message: Option<String> },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Malformed(String),
}

impl ApiFailure {
    /// Message to show the user: the service's own, else a generic one
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            Self::NotConfigured => "Resume access is not available right now.".to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Calls the client flow makes over the network
#[async_trait]
pub trait ResumeApi: Send + Sync {
    /// Redeem a proof token for a signed link
    async fn verify(&self, token: &str) -> Result<VerifiedLink, ApiFailure>;

    /// Fetch the bytes behind a signed link
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ApiFailure>;
}

/// Anything the service may send back
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyReply {
    #[serde(default)]
    success: bool,
    resume_url: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
    message: Option<String>,
}

/// Interpret a reply body, whatever its status
fn interpret(status: u16, body: &[u8]) -> Result<VerifiedLink, ApiFailure> {
    let reply: VerifyReply = serde_json::from_slice(body).unwrap_or_default();

    match reply {
        VerifyReply {
            success: true,
            resume_url: Some(resume_url),
            expires_in,
            ..
        } if (200..300).contains(&status) => {
            reqwest::Url::parse(&resume_url)
                .map_err(|e| ApiFailure::Malformed(format!("resumeUrl is not a URL: {e}")))?;
            Ok(VerifiedLink {
                resume_url,
                expires_in: expires_in.unwrap_or_default(),
            })
        }
        reply => Err(ApiFailure::Rejected {
            status,
            message: reply.error.or(reply.message),
        }),
    }
}

/// reqwest-backed client
#[derive(Clone)]
pub struct HttpResumeApi {
    http: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpResumeApi {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
        }
    }
}

#[async_trait]
impl ResumeApi for HttpResumeApi {
    async fn verify(&self, token: &str) -> Result<VerifiedLink, ApiFailure> {
        let endpoint = self.endpoint.as_deref().ok_or(ApiFailure::NotConfigured)?;

        let response = self
            .http
            .post(endpoint)
            .json(&VerifyRequest {
                token: token.to_string(),
            })
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        tracing::debug!(status, "Verification endpoint replied");
        interpret(status, &body)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ApiFailure> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiFailure::Rejected {
                status: status.as_u16(),
                message: None,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiFailure::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
