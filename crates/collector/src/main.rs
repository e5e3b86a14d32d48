//! nmea-collect - marine NMEA 0183 collector
//!
//! Ingests NMEA sentences from TCP, UDP, HTTP, serial devices and stdin,
//! validates them, and fans the stream out to TCP/UDP forwarders, a rolling
//! raw recorder, a movement-triggered GPX track recorder and a live
//! instruments endpoint.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (reads nmea-collect.toml when present)
//! nmea-collect
//!
//! # Explicit configuration
//! nmea-collect --config /etc/nmea-collect.toml
//! ```

mod serve;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use nmea_config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default configuration path probed when none is given
const DEFAULT_CONFIG: &str = "nmea-collect.toml";

/// Marine NMEA 0183 collector
#[derive(Parser, Debug)]
#[command(name = "nmea-collect")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        // An explicitly named file must exist
        Some(path) => Config::from_file(path)?,
        None if std::path::Path::new(DEFAULT_CONFIG).exists() => {
            Config::from_file(DEFAULT_CONFIG)?
        }
        None => Config::default(),
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or_else(|| config.log.level.as_str());
    init_logging(level)?;

    serve::run(config).await
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
