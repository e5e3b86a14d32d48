//! Ingest transport configuration

use serde::Deserialize;

/// Where NMEA lines come from
///
/// Any combination may be active at once; all transports feed the same
/// pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Read from standard input
    pub stdin: bool,

    /// Addresses to dial for raw NMEA text (e.g. "172.16.1.2:2000")
    pub tcp_connect: Vec<String>,

    /// Ports to listen on for broadcast datagrams
    pub udp_listen: Vec<u16>,

    /// Ports to accept POSTed line streams on
    pub http_listen: Vec<u16>,

    /// Serial device paths to read
    pub serial: Vec<String>,
}
