//! Shared constants for the resume gate components.

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8888";

/// Default Redis connection URL (only used by the shared rate-limit backend)
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Requests allowed per caller per window
pub const RATE_LIMIT_MAX_REQUESTS: u32 = 5;

/// Fixed rate-limit window (15 minutes)
pub const RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

/// Interval between sweeps of expired rate-limit records (1 minute)
pub const RATE_LIMIT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Lifetime of a signed resume link (5 minutes)
pub const RESUME_LINK_TTL_SECS: u64 = 300;

/// Longest lifetime S3 accepts for a presigned URL (7 days)
pub const MAX_LINK_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default object key of the resume in the bucket
pub const DEFAULT_RESUME_KEY: &str = "resume.pdf";

/// Default AWS region for the resume bucket
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Allowed CORS origin when none is configured
pub const DEFAULT_ALLOWED_ORIGIN: &str = "*";

/// Turnstile server-side verification endpoint
pub const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Caller address used when no forwarding header is present
pub const UNKNOWN_CALLER: &str = "unknown";

/// Redis key prefixes
pub mod redis_keys {
    /// Rate limit counters: resume-gate:ratelimit:{caller}
    pub const RATELIMIT_PREFIX: &str = "resume-gate:ratelimit:";
}

/// HTTP header names
pub mod headers {
    /// Proxy chain of client addresses, original client first
    pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

    /// Single client address set by the edge proxy
    pub const X_REAL_IP: &str = "x-real-ip";

    /// Value of `Access-Control-Allow-Headers`
    pub const CORS_ALLOW_HEADERS: &str = "Content-Type";

    /// Value of `Access-Control-Allow-Methods`
    pub const CORS_ALLOW_METHODS: &str = "POST, OPTIONS";
}

/// Messages returned to callers
pub mod messages {
    pub const RATE_LIMITED: &str = "Too many requests. Please try again later.";
    pub const INVALID_TOKEN: &str = "Invalid request. Token is required.";
    pub const VERIFICATION_FAILED: &str = "Verification failed. Please try again.";
    pub const INTERNAL: &str = "Internal server error. Please try again later.";
}
