//! gatekeeper
//!
//! ```text
//!     Client ──▶ security headers ─▶ response time ─▶ timeout ─▶ body limit
//!                                                                    │
//!            ◀── resources ◀── auth ◀── hpp ◀── cors ◀── rate limit ◀── gzip
//! ```

use std::path::PathBuf;

use clap::Parser;

use gatekeeper::config::load_config;
use gatekeeper::lifecycle::startup;
use gatekeeper::observability::logging::init_logging;
use gatekeeper::resources;

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "Security middleware pipeline in front of HTTP resources", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        rate_limit = config.rate_limit.enabled,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Configuration loaded"
    );

    startup::run(config, resources::router()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
