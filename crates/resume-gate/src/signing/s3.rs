//! Presigned S3 GET URLs for the resume object.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use gate_common::GateError;
use std::time::Duration;

use super::{LinkSigner, SignedResumeLink};
use crate::config::ResumeConfig;

/// Presigns `GetObject` for one configured bucket/key.
///
/// Credentials come from the default AWS provider chain. Signing is local,
/// the object itself is never read.
pub struct S3LinkSigner {
    client: S3Client,
    bucket: Option<String>,
    key: String,
    ttl: Duration,
}

impl S3LinkSigner {
    /// Build a client for the configured region from the environment
    pub async fn from_env(config: &ResumeConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        tracing::info!(region = %config.region, "S3 link signer initialized");
        Self::new(S3Client::new(&sdk_config), config)
    }

    pub fn new(client: S3Client, config: &ResumeConfig) -> Self {
        if config.bucket.is_none() {
            tracing::warn!("S3_BUCKET_NAME not configured, every link request will fail with 500");
        }

        Self {
            client,
            bucket: config.bucket.clone(),
            key: config.key.clone(),
            ttl: Duration::from_secs(config.link_ttl_secs),
        }
    }
}

#[async_trait]
impl LinkSigner for S3LinkSigner {
    async fn presign(&self) -> Result<SignedResumeLink, GateError> {
        let bucket = self
            .bucket
            .as_deref()
            .ok_or_else(|| GateError::Config("S3_BUCKET_NAME not configured".to_string()))?;

        let presigning =
            PresigningConfig::expires_in(self.ttl).map_err(|e| GateError::Signing(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(&self.key)
            .presigned(presigning)
            .await
            .map_err(|e| GateError::Signing(e.to_string()))?;

        Ok(SignedResumeLink::new(request.uri().to_string(), self.ttl))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::Credentials;

    fn signer(bucket: Option<&str>) -> S3LinkSigner {
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-west-1"))
            .credentials_provider(Credentials::new(
                "AKIDEXAMPLE",
                "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
                None,
                None,
                "test",
            ))
            .build();

        let config = ResumeConfig {
            bucket: bucket.map(str::to_string),
            ..ResumeConfig::default()
        };
        S3LinkSigner::new(S3Client::from_conf(conf), &config)
    }

    #[tokio::test]
    async fn test_presigned_url_shape() {
        let link = signer(Some("private-docs")).presign().await.unwrap();
        let url = reqwest::Url::parse(&link.url).unwrap();

        assert_eq!(url.scheme(), "https");
        assert!(url.host_str().unwrap().contains("private-docs"));
        assert!(url.path().ends_with("/resume.pdf"));

        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |name: &str| query.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone());
        assert_eq!(get("X-Amz-Expires").as_deref(), Some("300"));
        assert!(get("X-Amz-Signature").is_some());
        assert!(get("X-Amz-Credential").unwrap().starts_with("AKIDEXAMPLE/"));

        assert_eq!(link.expires_in, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_missing_bucket_is_config_error() {
        let err = signer(None).presign().await.unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }
}
