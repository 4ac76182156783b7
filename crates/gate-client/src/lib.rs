//! # Gate Client
//!
//! Client side of the resume access flow: a small state machine that takes
//! the challenge widget's proof token, trades it for a signed link, and
//! opens or downloads the resume.
//!
//! ## Modules
//! - `state` - The `VerificationFlow` finite-state machine
//! - `api` - HTTP calls to the verification endpoint and the signed link
//! - `session` - Runs the flow against an API and a link opener

pub mod api;
pub mod session;
pub mod state;

pub use api::{ApiFailure, HttpResumeApi, ResumeApi, VerifiedLink};
pub use session::{LinkOpener, ResumeSession, SessionError};
pub use state::{VerificationFlow, VerificationState};
