//! resume-fetch: walk the resume access flow from a terminal.
//!
//! The proof token normally comes from the challenge widget on the page;
//! here it is passed on the command line.

use anyhow::{Result, bail};
use clap::Parser;
use gate_client::{HttpResumeApi, LinkOpener, ResumeSession, VerificationState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Exchange a challenge token for a signed resume link
#[derive(Parser, Debug)]
#[command(name = "resume-fetch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verification endpoint, e.g. https://api.example.com/verify
    #[arg(long, env = "RESUME_VERIFY_ENDPOINT")]
    endpoint: Option<String>,

    /// Proof token issued by the challenge widget
    #[arg(long)]
    token: Option<String>,

    /// Save the resume here once verified
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "LOG_LEVEL")]
    log_level: String,
}

/// "Opens" a link by printing it
struct StdoutOpener;

impl LinkOpener for StdoutOpener {
    fn open(&self, url: &str) {
        println!("{url}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let session = ResumeSession::new(
        Arc::new(HttpResumeApi::new(args.endpoint)),
        Arc::new(StdoutOpener),
    );

    let state = match args.token {
        Some(token) => session.submit_token(&token).await?,
        None => {
            session.widget_failed().await?;
            session.state().await
        }
    };

    match state {
        VerificationState::Verified { expires_in, .. } => {
            eprintln!("Link valid for {expires_in}s");
            if let Some(path) = args.output {
                let size = session.download(&path).await?;
                eprintln!("Saved {size} bytes to {}", path.display());
            }
            Ok(())
        }
        VerificationState::Error { message } => bail!(message),
        other => bail!("verification did not settle (state: {})", other.name()),
    }
}
