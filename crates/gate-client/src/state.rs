//! Resume access state machine.
//!
//! ```text
//!            widget ok              reply ok
//!   Idle ─────────────▶ Verifying ─────────────▶ Verified
//!    ▲  │                 │   │
//!    │  │ widget error    │   │ reply failed
//!    │  ▼                 │   ▼
//!    └── Error ◀──────────┘  (cancel: Verifying ─▶ Idle)
//!          retry
//! ```
//!
//! Every attempt gets a ticket. Only the ticket of the attempt currently in
//! `Verifying` can complete it, so a late reply from an abandoned attempt
//! cannot overwrite a newer one.

use thiserror::Error;

/// Shown when the reply carries no message of its own
pub const GENERIC_FAILURE: &str = "Verification failed. Please try again.";

/// Shown when the challenge widget reports an error
pub const WIDGET_FAILURE: &str = "The verification challenge failed to load. Please try again.";

/// Where the resume flow currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    /// Challenge widget is shown
    Idle,
    /// One request to the verification endpoint is in flight
    Verifying { attempt: u64 },
    /// A signed link was obtained
    Verified { resume_url: String, expires_in: u64 },
    /// Something failed; `retry` goes back to `Idle`
    Error { message: String },
}

impl VerificationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Verifying { .. } => "verifying",
            Self::Verified { .. } => "verified",
            Self::Error { .. } => "error",
        }
    }

    pub fn resume_url(&self) -> Option<&str> {
        match self {
            Self::Verified { resume_url, .. } => Some(resume_url),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}

/// Proof that the holder started a particular attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTicket(u64);

impl AttemptTicket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Result of one verification request, as seen by the flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Verified { resume_url: String, expires_in: u64 },
    Failed { message: String },
}

/// What happened to a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The attempt was superseded; nothing changed
    Stale,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// The resume access finite-state machine
#[derive(Debug)]
pub struct VerificationFlow {
    state: VerificationState,
    next_attempt: u64,
}

impl Default for VerificationFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationFlow {
    pub fn new() -> Self {
        Self {
            state: VerificationState::Idle,
            next_attempt: 1,
        }
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    fn invalid(&self, action: &'static str) -> FlowError {
        FlowError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    /// Widget produced a token: Idle → Verifying
    pub fn on_widget_success(&mut self) -> Result<AttemptTicket, FlowError> {
        if self.state != VerificationState::Idle {
            return Err(self.invalid("start verification"));
        }

        let ticket = AttemptTicket(self.next_attempt);
        self.next_attempt += 1;
        self.state = VerificationState::Verifying { attempt: ticket.0 };
        Ok(ticket)
    }

    /// Widget failed to load or errored: Idle → Error
    pub fn on_widget_error(&mut self) -> Result<(), FlowError> {
        if self.state != VerificationState::Idle {
            return Err(self.invalid("report a widget error"));
        }

        self.state = VerificationState::Error {
            message: WIDGET_FAILURE.to_string(),
        };
        Ok(())
    }

    /// Apply the reply of an attempt: Verifying → Verified | Error
    pub fn complete(&mut self, ticket: AttemptTicket, outcome: AttemptOutcome) -> Completion {
        match self.state {
            VerificationState::Verifying { attempt } if attempt == ticket.0 => {}
            _ => return Completion::Stale,
        }

        self.state = match outcome {
            AttemptOutcome::Verified {
                resume_url,
                expires_in,
            } => VerificationState::Verified {
                resume_url,
                expires_in,
            },
            AttemptOutcome::Failed { message } => VerificationState::Error { message },
        };
        Completion::Applied
    }

    /// Abandon the in-flight attempt: Verifying → Idle
    pub fn cancel(&mut self) -> Result<(), FlowError> {
        if !matches!(self.state, VerificationState::Verifying { .. }) {
            return Err(self.invalid("cancel"));
        }
        self.state = VerificationState::Idle;
        Ok(())
    }

    /// Error → Idle, clearing the message
    pub fn retry(&mut self) -> Result<(), FlowError> {
        if !matches!(self.state, VerificationState::Error { .. }) {
            return Err(self.invalid("retry"));
        }
        self.state = VerificationState::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn verified(url: &str) -> AttemptOutcome {
        AttemptOutcome::Verified {
            resume_url: url.to_string(),
            expires_in: 300,
        }
    }

    #[test]
    fn test_happy_path() {
        let mut flow = VerificationFlow::new();
        assert_eq!(flow.state(), &VerificationState::Idle);

        let ticket = flow.on_widget_success().unwrap();
        assert_eq!(flow.state().name(), "verifying");

        assert_eq!(flow.complete(ticket, verified("https://x/r.pdf")), Completion::Applied);
        assert_eq!(flow.state().resume_url(), Some("https://x/r.pdf"));
    }

    #[test]
    fn test_failure_then_retry_clears_message() {
        let mut flow = VerificationFlow::new();
        let ticket = flow.on_widget_success().unwrap();
        flow.complete(
            ticket,
            AttemptOutcome::Failed {
                message: "nope".to_string(),
            },
        );
        assert_eq!(flow.state().error_message(), Some("nope"));

        assert_ok!(flow.retry());
        assert_eq!(flow.state(), &VerificationState::Idle);
        assert_eq!(flow.state().error_message(), None);
    }

    #[test]
    fn test_widget_error() {
        let mut flow = VerificationFlow::new();
        flow.on_widget_error().unwrap();
        assert_eq!(flow.state().error_message(), Some(WIDGET_FAILURE));
    }

    #[test]
    fn test_widget_only_accepted_when_idle() {
        let mut flow = VerificationFlow::new();
        flow.on_widget_success().unwrap();

        assert_eq!(
            flow.on_widget_success(),
            Err(FlowError::InvalidTransition {
                action: "start verification",
                state: "verifying"
            })
        );
        assert_err!(flow.on_widget_error());
        assert_err!(flow.retry());
    }

    #[test]
    fn test_stale_reply_after_cancel_is_ignored() {
        let mut flow = VerificationFlow::new();
        let slow = flow.on_widget_success().unwrap();
        flow.cancel().unwrap();
        let fast = flow.on_widget_success().unwrap();
        assert_ne!(slow, fast);

        // Late failure from the abandoned attempt
        let late = flow.complete(
            slow,
            AttemptOutcome::Failed {
                message: "timed out".to_string(),
            },
        );
        assert_eq!(late, Completion::Stale);
        assert_eq!(flow.state(), &VerificationState::Verifying { attempt: fast.id() });

        assert_eq!(flow.complete(fast, verified("https://x/new.pdf")), Completion::Applied);

        // And once settled, nothing else lands
        assert_eq!(flow.complete(slow, verified("https://x/old.pdf")), Completion::Stale);
        assert_eq!(flow.state().resume_url(), Some("https://x/new.pdf"));
    }

    #[test]
    fn test_cancel_only_while_verifying() {
        let mut flow = VerificationFlow::new();
        assert_err!(flow.cancel());
    }
}
