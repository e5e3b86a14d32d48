//! NMEA 0183 protocol support
//!
//! The shared vocabulary for the collector pipeline:
//!
//! - Line framing and checksum validation ([`line`])
//! - The sentence vocabulary as a tagged enum over typed records ([`sentence`])
//! - AIS payload header extraction ([`ais`])
//! - The live-instrument extensions snapshot carried into GPX files
//!   ([`extensions`])
//! - Synthetic sentence composition ([`compose`])
//!
//! Only the sentence types the pipeline actually consumes are parsed; every
//! other type is reported as [`ParseError::Unsupported`] so consumers can
//! count rather than fail.

pub mod ais;
pub mod compose;
pub mod extensions;
pub mod line;
pub mod sentence;

mod error;

pub use error::ParseError;
pub use extensions::Extensions;
pub use line::{checksum, validate, Reject};
pub use sentence::Sentence;
