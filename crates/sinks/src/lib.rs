//! Pipeline consumers
//!
//! Everything downstream of the tees:
//!
//! - [`UdpForwarder`] - batches lines into bounded datagrams for a set of
//!   destinations, flushing on size or delay
//! - [`tcp_broadcast`] - replays the stream to any number of inbound TCP
//!   clients
//! - [`RawRecorder`] - rolling, optionally gzipped files of the raw stream
//!   with interleaved time stamps
//! - [`gpx`] - the movement-triggered GPX track recorder

pub mod gpx;
pub mod tcp_broadcast;
pub mod util;

mod raw;
mod udp_forward;

pub use raw::{RawRecorder, RawRecorderConfig};
pub use tcp_broadcast::TcpBroadcast;
pub use udp_forward::{UdpForwarder, UdpForwarderConfig};
