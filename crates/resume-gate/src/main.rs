//! # Resume Gate
//!
//! Serves time-limited links to a private resume, but only to callers that
//! solved the site's bot-check challenge.
//!
//! ## Flow
//! ```text
//! Browser ──POST /verify {token}──▶ Resume Gate ──siteverify──▶ Turnstile
//!                                       │
//!                                       ├── fixed-window rate limit (memory | Redis)
//!                                       └── presign GetObject ──▶ S3 URL (300s)
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod challenge;
mod config;
mod ratelimit;
mod routes;
mod signing;
mod state;

use config::AppConfig;
use state::AppState;

/// Resume Gate - challenge-protected resume links
#[derive(Parser, Debug)]
#[command(name = "resume-gate")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/resume-gate.toml")]
    config: String,

    /// Listen address (overrides config)
    #[arg(short, long, env = "LISTEN_ADDR")]
    listen: Option<String>,

    /// Allowed CORS origin (overrides config)
    #[arg(long, env = "ALLOWED_ORIGIN")]
    allowed_origin: Option<String>,

    /// Redis URL for the shared rate-limit backend (overrides config)
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Turnstile secret key
    #[arg(long, env = "TURNSTILE_SECRET_KEY", hide_env_values = true)]
    turnstile_secret: Option<String>,

    /// Bucket holding the resume
    #[arg(long, env = "S3_BUCKET_NAME")]
    bucket: Option<String>,

    /// Bucket region
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Object key of the resume
    #[arg(long, env = "RESUME_S3_KEY")]
    resume_key: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal in production
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!(
        "🔐 Starting Resume Gate v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    let listen_addr = config.listen_addr.clone();
    let sweep_interval = config.rate_limit.sweep_interval();

    // Initialize application state
    let (state, memory_limiter) = AppState::from_config(config).await?;

    if let Some(limiter) = &memory_limiter {
        limiter.start(sweep_interval).await;
        tracing::warn!("Rate limits are per instance; use the redis backend when running several");
    }

    // Build router
    let app = routes::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!("🚀 Resume Gate listening on {}", listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
        info!("🛑 Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    if let Some(limiter) = memory_limiter {
        limiter.stop().await;
    }

    info!("👋 Resume Gate shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
