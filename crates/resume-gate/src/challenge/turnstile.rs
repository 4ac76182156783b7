//! Cloudflare Turnstile siteverify client.

use async_trait::async_trait;
use gate_common::GateError;
use serde::Deserialize;
use std::time::Duration;

use super::ChallengeVerifier;
use crate::config::TurnstileConfig;

/// siteverify response body
#[derive(Debug, Clone, Deserialize)]
pub struct SiteVerifyResponse {
    pub success: bool,
    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,
    #[serde(default)]
    pub challenge_ts: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

/// Turnstile verifier service
pub struct TurnstileVerifier {
    http: reqwest::Client,
    secret_key: Option<String>,
    verify_url: String,
}

impl TurnstileVerifier {
    pub fn new(config: &TurnstileConfig) -> Result<Self, GateError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| GateError::Config(format!("failed to create HTTP client: {e}")))?;

        if config.secret_key.is_none() {
            tracing::warn!("TURNSTILE_SECRET_KEY not configured, every verification will fail with 500");
        }

        Ok(Self {
            http,
            secret_key: config.secret_key.clone(),
            verify_url: config.verify_url.clone(),
        })
    }

    async fn siteverify(
        &self,
        secret: &str,
        token: &str,
        remote_ip: &str,
    ) -> Result<SiteVerifyResponse, reqwest::Error> {
        self.http
            .post(&self.verify_url)
            .form(&[
                ("secret", secret),
                ("response", token),
                ("remoteip", remote_ip),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<SiteVerifyResponse>()
            .await
    }
}

#[async_trait]
impl ChallengeVerifier for TurnstileVerifier {
    async fn verify(&self, token: &str, remote_ip: &str) -> Result<bool, GateError> {
        let secret = self
            .secret_key
            .as_deref()
            .ok_or_else(|| GateError::Config("TURNSTILE_SECRET_KEY not configured".to_string()))?;

        match self.siteverify(secret, token, remote_ip).await {
            Ok(resp) if resp.success => {
                tracing::debug!(
                    hostname = ?resp.hostname,
                    challenge_ts = ?resp.challenge_ts,
                    "Challenge token accepted"
                );
                Ok(true)
            }
            Ok(resp) => {
                tracing::warn!(error_codes = ?resp.error_codes, "Challenge token rejected");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(error = %e, "Error calling siteverify");
                Ok(false)
            }
        }
    }
}
