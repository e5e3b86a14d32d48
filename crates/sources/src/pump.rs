//! The validating line pump
//!
//! Shared machinery between every stream-shaped transport: accumulate bytes,
//! split out CR/LF-terminated lines bounded to [`MAX_LINE_LENGTH`], validate
//! each line and publish the good ones. Channel sends race against
//! cancellation so a full pipeline never wedges shutdown.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use nmea_pipeline::Line;
use nmea_protocol::validate;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::SourceMetrics;
use crate::{SourceError, MAX_LINE_LENGTH};

/// Read chunk size
const READ_CHUNK: usize = 8 * 1024;

/// Splits a byte stream into lines
///
/// Lines end at `\n`; a preceding `\r` is stripped. A line longer than the
/// bound is an error, which ends the source (the transport is talking
/// something other than NMEA).
pub(crate) struct LineSplitter {
    buf: BytesMut,
}

impl LineSplitter {
    pub(crate) fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    pub(crate) fn buf_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    pub(crate) fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Take the next complete line out of the buffer
    pub(crate) fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        match self.buf.iter().position(|&b| b == b'\n') {
            Some(nl) => {
                let mut end = nl;
                if end > 0 && self.buf[end - 1] == b'\r' {
                    end -= 1;
                }
                let line = String::from_utf8_lossy(&self.buf[..end]).into_owned();
                self.buf.advance(nl + 1);
                Ok(Some(line))
            }
            None if self.buf.len() > MAX_LINE_LENGTH => {
                Err(SourceError::LineTooLong(MAX_LINE_LENGTH))
            }
            None => Ok(None),
        }
    }

    /// Take whatever is left as a final unterminated line
    pub(crate) fn take_remainder(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Some(line)
    }
}

/// Validates lines and publishes them onto the central channel
#[derive(Clone)]
pub(crate) struct LinePump {
    name: String,
    sender: mpsc::Sender<Line>,
    metrics: Arc<SourceMetrics>,
    read_timeout: Option<Duration>,
}

impl LinePump {
    pub(crate) fn new(
        name: String,
        sender: mpsc::Sender<Line>,
        metrics: Arc<SourceMetrics>,
        read_timeout: Option<Duration>,
    ) -> Self {
        Self {
            name,
            sender,
            metrics,
            read_timeout,
        }
    }

    pub(crate) fn metrics(&self) -> &Arc<SourceMetrics> {
        &self.metrics
    }

    /// Pump the reader until EOF, error or cancellation
    ///
    /// EOF is reported as [`SourceError::Eof`] so the supervisor reopens the
    /// transport; callers for which EOF is a normal end map it away.
    pub(crate) async fn run<R>(
        &self,
        mut reader: R,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError>
    where
        R: AsyncRead + Unpin,
    {
        let mut splitter = LineSplitter::new();

        loop {
            while let Some(line) = splitter.next_line()? {
                self.publish(line, cancel).await?;
                if cancel.is_cancelled() {
                    return Ok(());
                }
            }

            let n = {
                let read_fut = reader.read_buf(splitter.buf_mut());
                match self.read_timeout {
                    Some(deadline) => tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        read = tokio::time::timeout(deadline, read_fut) => {
                            read.map_err(|_| SourceError::IdleTimeout(deadline))??
                        }
                    },
                    None => tokio::select! {
                        _ = cancel.cancelled() => return Ok(()),
                        read = read_fut => read?,
                    },
                }
            };

            if n == 0 {
                return Err(SourceError::Eof);
            }
            self.metrics.bytes.add(n as u64);
        }
    }

    /// Validate one line and send it on
    pub(crate) async fn publish(
        &self,
        line: String,
        cancel: &CancellationToken,
    ) -> Result<(), SourceError> {
        self.metrics.received.inc();

        if let Err(reject) = validate(&line) {
            self.metrics.reject(reject);
            tracing::trace!(source = %self.name, reject = %reject, "line rejected");
            return Ok(());
        }

        tokio::select! {
            _ = cancel.cancelled() => Ok(()),
            sent = self.sender.send(Line::from(line)) => {
                sent.map_err(|_| SourceError::ChannelClosed)
            }
        }
    }
}

#[cfg(test)]
#[path = "pump_test.rs"]
mod pump_test;
