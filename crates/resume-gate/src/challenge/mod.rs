//! Challenge token verification.
//!
//! The widget on the page produces an opaque proof token. The service
//! redeems it against the provider's siteverify API before issuing a link.

mod turnstile;

pub use turnstile::TurnstileVerifier;

use async_trait::async_trait;
use gate_common::GateError;

/// Redeems proof tokens against the challenge provider
#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    /// Returns `Ok(true)` only when the provider accepted the token.
    ///
    /// Provider rejections and transport failures are `Ok(false)`. `Err` is
    /// reserved for local misconfiguration.
    async fn verify(&self, token: &str, remote_ip: &str) -> Result<bool, GateError>;
}
