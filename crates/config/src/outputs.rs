//! Output configuration: listeners, recorders, metrics, probing

use std::time::Duration;

use serde::Deserialize;

/// TCP broadcast listeners
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListenConfig {
    /// Listen address replaying every line; empty disables
    /// Default: ":2000"
    pub tcp_all: String,

    /// Listen address replaying AIS traffic only; empty disables
    /// Default: ":2010"
    pub tcp_ais: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            tcp_all: ":2000".into(),
            tcp_ais: ":2010".into(),
        }
    }
}

/// GPX track recording
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpxConfig {
    /// strftime-style file name pattern; empty disables track recording
    /// Default: "track-%Y%m%d-%H%M%S.gpx"
    pub pattern: String,

    /// Minimum time between recorded track points
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub sample_interval: Duration,

    /// Minimum movement within the trigger window to start a track (meters)
    /// Default: 25
    pub trigger_distance_m: f64,

    /// Movement time window for starting a track
    /// Default: 1m
    #[serde(with = "humantime_serde")]
    pub trigger_window: Duration,

    /// Movement time window before ending a track
    /// Default: 5m
    #[serde(with = "humantime_serde")]
    pub cooldown_window: Duration,
}

impl Default for GpxConfig {
    fn default() -> Self {
        Self {
            pattern: "track-%Y%m%d-%H%M%S.gpx".into(),
            sample_interval: Duration::from_secs(10),
            trigger_distance_m: 25.0,
            trigger_window: Duration::from_secs(60),
            cooldown_window: Duration::from_secs(5 * 60),
        }
    }
}

/// Raw stream recording
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    /// strftime-style file name pattern; empty disables raw recording
    /// Default: "nmea-raw.%Y%m%d-%H%M%S.gz"
    pub pattern: String,

    /// Write buffer size
    /// Default: 131072
    pub buffer_size: usize,

    /// Write plain text instead of gzip
    /// Default: false
    pub uncompressed: bool,

    /// How often a new raw file is started
    /// Default: 24h
    #[serde(with = "humantime_serde")]
    pub time_window: Duration,

    /// How often buffered data is flushed to disk
    /// Default: 5m
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            pattern: "nmea-raw.%Y%m%d-%H%M%S.gz".into(),
            buffer_size: 128 * 1024,
            uncompressed: false,
            time_window: Duration::from_secs(24 * 60 * 60),
            flush_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Metrics endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// HTTP listen address for the scrape endpoint; empty disables
    /// Default: "127.0.0.1:9140"
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9140".into(),
        }
    }
}

/// Outbound serial voltage probing
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Serial devices to solicit voltage reports on
    pub serial: Vec<String>,

    /// Solicitation interval
    /// Default: 1m
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            serial: Vec::new(),
            interval: Duration::from_secs(60),
        }
    }
}
