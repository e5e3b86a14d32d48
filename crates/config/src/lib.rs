//! Collector configuration
//!
//! TOML-based configuration with working defaults: an empty file (or none at
//! all) yields a collector that listens on the standard broadcast ports,
//! records raw data and tracks, and serves metrics on localhost. Only
//! specify what you need to change.
//!
//! # Example
//!
//! ```toml
//! [input]
//! tcp_connect = ["172.16.1.2:2000"]
//! udp_listen = [2000]
//!
//! [forward.udp_ais]
//! destinations = ["ais-aggregator.example.com:4711"]
//!
//! [raw]
//! pattern = "raw/%Y%m/nmea-raw.%Y%m%d-%H%M%S.gz"
//! ```

mod error;
mod forward;
mod input;
mod logging;
mod outputs;

pub use error::{ConfigError, Result};
pub use forward::{AisUdpForwardConfig, ForwardConfig, UdpForwardConfig};
pub use input::InputConfig;
pub use logging::{LogConfig, LogLevel};
pub use outputs::{GpxConfig, ListenConfig, MetricsConfig, ProbeConfig, RawConfig};

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

/// Root configuration
///
/// Every section is optional and carries its own defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Logging
    pub log: LogConfig,

    /// Ingest transports
    pub input: InputConfig,

    /// UDP forwarding, all-traffic and AIS-only
    pub forward: ForwardConfig,

    /// TCP broadcast listeners
    pub listen: ListenConfig,

    /// GPX track recording
    pub gpx: GpxConfig,

    /// Raw stream recording
    pub raw: RawConfig,

    /// Metrics endpoint
    pub metrics: MetricsConfig,

    /// Outbound serial voltage probing
    pub probe: ProbeConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        contents.parse()
    }

    fn validate(&self) -> Result<()> {
        for (name, destinations, max_packet_size) in [
            (
                "udp_all",
                &self.forward.udp_all.destinations,
                self.forward.udp_all.max_packet_size,
            ),
            (
                "udp_ais",
                &self.forward.udp_ais.destinations,
                self.forward.udp_ais.max_packet_size,
            ),
        ] {
            if !destinations.is_empty() && max_packet_size < 64 {
                return Err(ConfigError::Invalid(format!(
                    "forward.{name}.max_packet_size must be at least 64"
                )));
            }
        }
        if !self.raw.pattern.is_empty() && self.raw.time_window.is_zero() {
            return Err(ConfigError::Invalid(
                "raw.time_window must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }
}
