//! Sink utilities

mod chain_writer;

pub use chain_writer::{ChainWrite, ChainWriter, GzipWriter, PlainTextWriter};
