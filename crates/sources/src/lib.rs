//! Line sources
//!
//! Each source opens one transport, splits the byte stream into
//! CR/LF-terminated lines, validates every line and publishes the survivors
//! onto the central channel. Sources are restart-scoped: a read error, idle
//! timeout or EOF ends `serve` with an error and the supervisor reopens the
//! transport after a backoff.
//!
//! # Transports
//!
//! - [`TcpSource`] - active dial to a remote NMEA server
//! - [`UdpSource`] - datagram listener, one or more lines per datagram
//! - [`HttpSource`] - accepts POSTed line streams on any path
//! - [`SerialSource`] - reads a serial device as a character stream
//! - [`StdinSource`] - reads standard input
//!
//! The odd one out is [`SerialProber`], which writes rather than reads: a
//! periodic proprietary solicitation that makes an AIS transponder report
//! its supply voltage on the inbound side.

mod common;
mod http;
mod probe;
mod pump;
mod serial;
mod tcp;
mod udp;

pub use common::{SourceMetrics, SourceMetricsHandle};
pub use http::HttpSource;
pub use probe::SerialProber;
pub use serial::{SerialSource, StdinSource};
pub use tcp::TcpSource;
pub use udp::UdpSource;

use std::time::Duration;

/// Maximum accepted line length
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Read-idle deadline for network transports
pub const READ_IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Source errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to dial a remote address
    #[error("failed to connect to {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to bind a listen address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No data within the read-idle deadline
    #[error("no data for {0:?}, reopening")]
    IdleTimeout(Duration),

    /// Transport reached end of stream
    #[error("end of stream")]
    Eof,

    /// A line exceeded the length bound
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    /// The central channel is gone; the pipeline is shutting down
    #[error("line channel closed")]
    ChannelClosed,
}
