//! Wire types shared by the service and the client.

use serde::{Deserialize, Serialize};

/// Body of a verification request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// Successful verification: a one-off signed link to the resume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeLinkResponse {
    pub success: bool,
    pub resume_url: String,
    /// Link lifetime in seconds
    pub expires_in: u64,
}

impl ResumeLinkResponse {
    pub fn new(resume_url: String, expires_in: u64) -> Self {
        Self {
            success: true,
            resume_url,
            expires_in,
        }
    }
}

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_response_uses_camel_case() {
        let resp = ResumeLinkResponse::new("https://example.com/r.pdf".into(), 300);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["resumeUrl"], "https://example.com/r.pdf");
        assert_eq!(json["expiresIn"], 300);
    }
}
