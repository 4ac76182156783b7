//! # Gate Common
//!
//! Shared types and constants used by the resume gate service and its client.
//!
//! ## Modules
//! - `types` - Wire payloads (request body, success and error responses)
//! - `error` - The gate's error taxonomy and its HTTP mapping
//! - `constants` - Rate-limit, link, and header constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::GateError;
pub use types::*;
