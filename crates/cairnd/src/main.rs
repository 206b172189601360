//! cairnd: cairn deployment daemon
//!
//! Usage:
//!   cairnd [--config /etc/cairn/cairn.toml] [--log info] [--log-format json]
//!
//! Serves the three-phase deploy protocol, raw path resolution, and the
//! /metrics, /healthz and /readyz endpoints on one listener.

mod daemon;
mod error;
mod metrics;
mod server;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cairnd", version, about = "cairn deployment daemon")]
struct Cli {
    /// Path to cairn.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "CAIRN_CONFIG",
        default_value = "/etc/cairn/cairn.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [server].log_level
    #[arg(long, env = "CAIRN_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides [server].log_format
    #[arg(long, env = "CAIRN_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // [server] may set the log level, so config is read before logging starts
    let config = cairn_core::config::CairnConfig::load(&cli.config)?;

    let level = cli.log.unwrap_or_else(|| config.server.log_level.clone());
    let format = cli.log_format.unwrap_or_else(|| {
        if config.server.log_format.eq_ignore_ascii_case("text") {
            LogFormat::Text
        } else {
            LogFormat::Json
        }
    });
    init_logging(&level, &format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "cairnd starting"
    );
    if !cli.config.exists() {
        warn!("config file not found: {}  (using defaults)", cli.config.display());
    }

    daemon::run(config).await
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }
}
