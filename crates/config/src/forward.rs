//! UDP forwarding configuration

use std::time::Duration;

use serde::Deserialize;

/// Both forwarder variants
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForwardConfig {
    /// Forward every validated line
    pub udp_all: UdpForwardConfig,

    /// Forward AIS traffic only
    pub udp_ais: AisUdpForwardConfig,
}

/// The all-traffic batching forwarder
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UdpForwardConfig {
    /// Destination addresses; empty disables the forwarder
    pub destinations: Vec<String>,

    /// Largest datagram to emit
    /// Default: 1472
    pub max_packet_size: usize,

    /// Longest a line may wait in the batch buffer
    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for UdpForwardConfig {
    fn default() -> Self {
        Self {
            destinations: Vec::new(),
            max_packet_size: 1472,
            max_delay: Duration::from_secs(1),
        }
    }
}

/// The AIS-only batching forwarder
///
/// Same shape as [`UdpForwardConfig`] but with a ten second delay bound: AIS
/// traffic tolerates latency in exchange for fuller packets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AisUdpForwardConfig {
    /// Destination addresses; empty disables the forwarder
    pub destinations: Vec<String>,

    /// Largest datagram to emit
    /// Default: 1472
    pub max_packet_size: usize,

    /// Longest a line may wait in the batch buffer
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for AisUdpForwardConfig {
    fn default() -> Self {
        Self {
            destinations: Vec::new(),
            max_packet_size: 1472,
            max_delay: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ais_variant_defaults_to_longer_delay() {
        let config: ForwardConfig = toml::from_str("").unwrap();
        assert_eq!(config.udp_all.max_delay, Duration::from_secs(1));
        assert_eq!(config.udp_ais.max_delay, Duration::from_secs(10));
        assert_eq!(config.udp_ais.max_packet_size, 1472);
    }

    #[test]
    fn partial_ais_section_keeps_its_defaults() {
        let config: ForwardConfig =
            toml::from_str("[udp_ais]\ndestinations = [\"host:4711\"]\n").unwrap();
        assert_eq!(config.udp_ais.destinations, vec!["host:4711"]);
        assert_eq!(config.udp_ais.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn delays_parse_human_durations() {
        let config: ForwardConfig =
            toml::from_str("[udp_all]\nmax_delay = \"250ms\"\n").unwrap();
        assert_eq!(config.udp_all.max_delay, Duration::from_millis(250));
    }
}
