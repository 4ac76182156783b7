//! Drives the state machine against the network.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::api::{ApiFailure, ResumeApi};
use crate::state::{AttemptOutcome, Completion, FlowError, VerificationFlow, VerificationState};

/// Shows a resume link to the user (browser tab, terminal, ...)
pub trait LinkOpener: Send + Sync {
    fn open(&self, url: &str);
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("no resume link yet")]
    NotVerified,

    #[error("download failed: {0}")]
    Fetch(#[from] ApiFailure),

    #[error("could not save resume: {0}")]
    Io(#[from] std::io::Error),
}

/// One user's pass through the resume access flow
pub struct ResumeSession {
    flow: Mutex<VerificationFlow>,
    api: Arc<dyn ResumeApi>,
    opener: Arc<dyn LinkOpener>,
}

impl ResumeSession {
    pub fn new(api: Arc<dyn ResumeApi>, opener: Arc<dyn LinkOpener>) -> Self {
        Self {
            flow: Mutex::new(VerificationFlow::new()),
            api,
            opener,
        }
    }

    pub async fn state(&self) -> VerificationState {
        self.flow.lock().await.state().clone()
    }

    /// Widget success callback: verify the token and, on success, open the link.
    ///
    /// Returns the state after this attempt settled. If the attempt was
    /// cancelled meanwhile, the state belongs to whatever superseded it.
    pub async fn submit_token(&self, token: &str) -> Result<VerificationState, SessionError> {
        let ticket = self.flow.lock().await.on_widget_success()?;
        tracing::debug!(attempt = ticket.id(), "Verifying challenge token");

        let outcome = match self.api.verify(token).await {
            Ok(link) => AttemptOutcome::Verified {
                resume_url: link.resume_url,
                expires_in: link.expires_in,
            },
            Err(e) => {
                tracing::warn!(attempt = ticket.id(), error = %e, "Verification failed");
                AttemptOutcome::Failed {
                    message: e.user_message(),
                }
            }
        };

        let mut flow = self.flow.lock().await;
        match flow.complete(ticket, outcome) {
            Completion::Applied => {
                if let Some(url) = flow.state().resume_url() {
                    tracing::info!(attempt = ticket.id(), "Resume link ready");
                    self.opener.open(url);
                }
            }
            Completion::Stale => {
                tracing::debug!(attempt = ticket.id(), "Discarding reply of superseded attempt");
            }
        }

        Ok(flow.state().clone())
    }

    /// Widget error callback
    pub async fn widget_failed(&self) -> Result<(), SessionError> {
        Ok(self.flow.lock().await.on_widget_error()?)
    }

    pub async fn retry(&self) -> Result<(), SessionError> {
        Ok(self.flow.lock().await.retry()?)
    }

    /// Abandon an in-flight verification
    pub async fn cancel(&self) -> Result<(), SessionError> {
        Ok(self.flow.lock().await.cancel()?)
    }

    /// Open the captured link again
    pub async fn open(&self) -> Result<(), SessionError> {
        let flow = self.flow.lock().await;
        let url = flow.state().resume_url().ok_or(SessionError::NotVerified)?;
        self.opener.open(url);
        Ok(())
    }

    /// Fetch the resume and save it to `path`. Returns the number of bytes written.
    pub async fn download(&self, path: &Path) -> Result<u64, SessionError> {
        let url = self
            .state()
            .await
            .resume_url()
            .map(str::to_string)
            .ok_or(SessionError::NotVerified)?;

        let bytes = self.api.fetch(&url).await?;
        tokio::fs::write(path, &bytes).await?;

        tracing::info!(path = %path.display(), size = bytes.len(), "Resume saved");
        Ok(bytes.len() as u64)
    }
}
