//! UDP listen source
//!
//! Binds a port and treats every datagram's contents as one or more
//! CR/LF-separated lines. Broadcast feeds burst, so the socket gets an
//! enlarged receive buffer via socket2 before tokio takes it over. The same
//! 15 second idle deadline as TCP applies; a silent feed is reopened by the
//! supervisor.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use nmea_pipeline::{Line, Service};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{SourceMetrics, SourceMetricsHandle};
use crate::pump::LinePump;
use crate::{SourceError, READ_IDLE_TIMEOUT};

/// Maximum datagram we care to receive
const MAX_DATAGRAM: usize = 64 * 1024;

/// Kernel receive buffer, sized for bursts
const SOCKET_BUFFER_SIZE: usize = 256 * 1024;

/// Reads NMEA datagrams from a bound UDP port
pub struct UdpSource {
    port: u16,
    pump: LinePump,
    metrics: Arc<SourceMetrics>,
}

impl UdpSource {
    pub fn new(port: u16, sender: mpsc::Sender<Line>) -> Self {
        let metrics = Arc::new(SourceMetrics::new());
        // The pump is used for validation and publishing only; datagram
        // framing is handled here, so no pump-level read timeout.
        let pump = LinePump::new(format!("udp/{port}"), sender, Arc::clone(&metrics), None);
        Self {
            port,
            pump,
            metrics,
        }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle::new(format!("udp/{}", self.port), Arc::clone(&self.metrics))
    }

    /// Build the listen socket with an enlarged receive buffer
    fn bind_socket(&self) -> std::io::Result<UdpSocket> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        if let Err(e) = socket.set_recv_buffer_size(SOCKET_BUFFER_SIZE) {
            tracing::warn!(
                error = %e,
                requested_size = SOCKET_BUFFER_SIZE,
                "failed to set UDP SO_RCVBUF"
            );
        }
        socket.bind(&addr.into())?;
        socket.set_nonblocking(true)?;

        UdpSocket::from_std(socket.into())
    }
}

#[async_trait]
impl Service for UdpSource {
    fn name(&self) -> String {
        format!("source/udp/{}", self.port)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let socket = self.bind_socket().map_err(|e| SourceError::Bind {
            address: format!(":{}", self.port),
            source: e,
        })?;

        tracing::info!(port = self.port, "UDP source listening");

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let len = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                received = tokio::time::timeout(READ_IDLE_TIMEOUT, socket.recv_from(&mut buf)) => {
                    let (len, _peer) = received
                        .map_err(|_| SourceError::IdleTimeout(READ_IDLE_TIMEOUT))?
                        .map_err(SourceError::Io)?;
                    len
                }
            };

            if len == 0 {
                continue;
            }
            self.metrics.bytes.add(len as u64);

            for line in datagram_lines(&buf[..len]) {
                self.pump.publish(line, &cancel).await?;
                if cancel.is_cancelled() {
                    return Ok(());
                }
            }
        }
    }
}

/// Split a datagram into lines
///
/// Lines are separated by `\n` with an optional preceding `\r`; a trailing
/// terminator does not produce an empty final line, but a datagram ending
/// mid-line still yields that partial line (datagrams do not concatenate).
fn datagram_lines(data: &[u8]) -> impl Iterator<Item = String> + '_ {
    let data = match data.last() {
        Some(b'\n') => {
            let end = if data.len() >= 2 && data[data.len() - 2] == b'\r' {
                data.len() - 2
            } else {
                data.len() - 1
            };
            &data[..end]
        }
        _ => data,
    };
    data.split(|&b| b == b'\n').map(|seg| {
        let seg = match seg.last() {
            Some(b'\r') => &seg[..seg.len() - 1],
            _ => seg,
        };
        String::from_utf8_lossy(seg).into_owned()
    })
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
