//! HTTP service scaffold.
//!
//! ```text
//!     Client Request
//!     ──▶ CORS / security headers
//!     ──▶ header validation ──▶ rate limit      (reject with JSON envelope)
//!     ──▶ body limit ──▶ request logger ──▶ error handler ──▶ routes
//!     ◀── Response
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::Instrument;

use service_scaffold::config::load_config;
use service_scaffold::lifecycle::startup;
use service_scaffold::observability::{logging, metrics};

#[derive(Debug, Parser)]
#[command(name = "service-scaffold", version, about = "Minimal HTTP service scaffold")]
struct Args {
    /// Optional TOML config file; environment variables override it.
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Load and validate the configuration, print a redacted summary and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;

    if args.check {
        println!("{}", serde_json::to_string_pretty(&config.summary())?);
        return Ok(());
    }

    logging::init_logging(&config.observability)?;

    if let Some(address) = &config.observability.metrics_address {
        // Validation already checked the address.
        let addr: SocketAddr = address.parse()?;
        metrics::init_metrics(addr)?;
    }

    startup::start(config)
        .instrument(logging::service_span())
        .await?;
    Ok(())
}
