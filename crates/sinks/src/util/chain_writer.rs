//! Chain writers for raw file output
//!
//! A trait abstraction over the buffering/compression stack wrapped around a
//! freshly created file, so the recorder can stay indifferent to whether it
//! writes plain text or gzip. Buffering sits in front of the compressor: the
//! recorder emits many small line writes, and the compressor prefers fewer,
//! larger ones.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use flate2::write::GzEncoder;
use flate2::Compression;

/// Builds the write chain for newly rotated files
pub trait ChainWriter: Send + Sync {
    /// Wrap a file with this writer's buffering/compression strategy
    fn wrap(&self, file: File) -> io::Result<Box<dyn ChainWrite>>;
}

/// The write side of a chain
///
/// Object-safe so the recorder can hold `Box<dyn ChainWrite>`.
pub trait ChainWrite: Write + Send {
    /// Flush buffered and compressed data through to the file without
    /// closing anything
    fn flush_all(&mut self) -> io::Result<()>;

    /// Finalise the chain: flush, close the compressor stream if any, and
    /// let the file go
    fn finish(self: Box<Self>) -> io::Result<()>;
}

// ============================================================================
// PlainTextWriter - buffered text output
// ============================================================================

/// Buffered plain text, no compression
#[derive(Debug, Clone)]
pub struct PlainTextWriter {
    buffer_size: usize,
}

impl PlainTextWriter {
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }
}

impl ChainWriter for PlainTextWriter {
    fn wrap(&self, file: File) -> io::Result<Box<dyn ChainWrite>> {
        Ok(Box::new(PlainChain {
            writer: BufWriter::with_capacity(self.buffer_size, file),
        }))
    }
}

struct PlainChain {
    writer: BufWriter<File>,
}

impl Write for PlainChain {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl ChainWrite for PlainChain {
    fn flush_all(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn finish(mut self: Box<Self>) -> io::Result<()> {
        self.writer.flush()
    }
}

// ============================================================================
// GzipWriter - gzip compressed output
// ============================================================================

/// Buffered gzip output
#[derive(Debug, Clone)]
pub struct GzipWriter {
    buffer_size: usize,
}

impl GzipWriter {
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }
}

impl ChainWriter for GzipWriter {
    fn wrap(&self, file: File) -> io::Result<Box<dyn ChainWrite>> {
        let encoder = GzEncoder::new(file, Compression::default());
        Ok(Box::new(GzipChain {
            writer: BufWriter::with_capacity(self.buffer_size, encoder),
        }))
    }
}

struct GzipChain {
    writer: BufWriter<GzEncoder<File>>,
}

impl Write for GzipChain {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl ChainWrite for GzipChain {
    fn flush_all(&mut self) -> io::Result<()> {
        // BufWriter::flush also flushes the encoder, pushing a sync point
        // into the gzip stream so the data on disk is readable
        self.writer.flush()
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        let encoder = self
            .writer
            .into_inner()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        encoder.finish()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "chain_writer_test.rs"]
mod chain_writer_test;
