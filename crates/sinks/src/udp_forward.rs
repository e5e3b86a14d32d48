//! Batching UDP forwarder
//!
//! Accumulates lines into a datagram buffer and flushes either when the next
//! line would overflow the packet bound or when the delay timer fires,
//! whichever comes first. Every flush writes the same datagram to each
//! destination; a destination that fails to send just gets its error counted
//! (UDP is best effort, destinations are independent).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use nmea_metrics::{Counter, Exposition, MetricsProvider};
use nmea_pipeline::{Line, Service};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Forwarder configuration
#[derive(Debug, Clone)]
pub struct UdpForwarderConfig {
    /// Destination addresses (`host:port`)
    pub destinations: Vec<String>,

    /// Largest datagram to emit
    pub max_packet_size: usize,

    /// Longest a line may sit in the buffer before a flush
    pub max_delay: Duration,
}

impl Default for UdpForwarderConfig {
    fn default() -> Self {
        Self {
            destinations: Vec::new(),
            max_packet_size: 1472,
            max_delay: Duration::from_secs(1),
        }
    }
}

/// Per-destination counters
#[derive(Debug, Default)]
struct DestinationMetrics {
    packets: Counter,
    bytes: Counter,
    errors: Counter,
}

/// Forwarder counters
#[derive(Debug, Default)]
pub struct UdpForwarderMetrics {
    received: Counter,
    destinations: Vec<(String, DestinationMetrics)>,
}

/// Handle for reporting forwarder metrics
#[derive(Clone)]
pub struct UdpForwarderMetricsHandle {
    metrics: Arc<UdpForwarderMetrics>,
}

impl MetricsProvider for UdpForwarderMetricsHandle {
    fn collect(&self, out: &mut Exposition) {
        out.counter(
            "nmea_forward_udp_received_messages_total",
            &[],
            self.metrics.received.get(),
        );
        for (addr, dest) in &self.metrics.destinations {
            let labels = &[("destination", addr.as_str())];
            out.counter(
                "nmea_forward_udp_sent_packets_total",
                labels,
                dest.packets.get(),
            );
            out.counter("nmea_forward_udp_sent_bytes_total", labels, dest.bytes.get());
            out.counter(
                "nmea_forward_udp_send_errors_total",
                labels,
                dest.errors.get(),
            );
        }
    }
}

/// Batches the line stream into datagrams for N destinations
pub struct UdpForwarder {
    config: UdpForwarderConfig,
    input: mpsc::Receiver<Line>,
    metrics: Arc<UdpForwarderMetrics>,
    buf: BytesMut,
}

impl UdpForwarder {
    pub fn new(config: UdpForwarderConfig, input: mpsc::Receiver<Line>) -> Self {
        let metrics = UdpForwarderMetrics {
            received: Counter::new(),
            destinations: config
                .destinations
                .iter()
                .map(|addr| (addr.clone(), DestinationMetrics::default()))
                .collect(),
        };
        let buf = BytesMut::with_capacity(config.max_packet_size);
        Self {
            config,
            input,
            metrics: Arc::new(metrics),
            buf,
        }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> UdpForwarderMetricsHandle {
        UdpForwarderMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Dial every destination, dropping the ones that fail
    ///
    /// Returns an error only when no destination remains.
    async fn dial_destinations(&self) -> anyhow::Result<Vec<(usize, UdpSocket)>> {
        let mut sockets = Vec::with_capacity(self.config.destinations.len());
        for (index, addr) in self.config.destinations.iter().enumerate() {
            let socket = match UdpSocket::bind("0.0.0.0:0").await {
                Ok(socket) => socket,
                Err(e) => anyhow::bail!("binding forward socket: {e}"),
            };
            match socket.connect(addr).await {
                Ok(()) => {
                    tracing::info!(destination = %addr, "forwarding to udp destination");
                    sockets.push((index, socket));
                }
                Err(e) => {
                    tracing::warn!(destination = %addr, error = %e, "dropping udp destination");
                }
            }
        }
        anyhow::ensure!(!sockets.is_empty(), "no valid UDP forward destination");
        Ok(sockets)
    }

    /// Send the buffered datagram to every destination and clear the buffer
    async fn flush(&mut self, sockets: &[(usize, UdpSocket)]) {
        if self.buf.is_empty() {
            return;
        }
        for (index, socket) in sockets {
            let dest = &self.metrics.destinations[*index];
            match socket.send(&self.buf).await {
                Ok(_) => {
                    dest.1.packets.inc();
                    dest.1.bytes.add(self.buf.len() as u64);
                }
                Err(e) => {
                    dest.1.errors.inc();
                    tracing::debug!(destination = %dest.0, error = %e, "udp send failed");
                }
            }
        }
        self.buf.clear();
    }
}

#[async_trait]
impl Service for UdpForwarder {
    fn name(&self) -> String {
        format!("forward/udp({})", self.config.destinations.join(","))
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let sockets = self.dial_destinations().await?;

        let delay = tokio::time::sleep(self.config.max_delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    // Ship whatever is pending before going down
                    self.flush(&sockets).await;
                    return Ok(());
                }

                line = self.input.recv() => {
                    let Some(line) = line else {
                        self.flush(&sockets).await;
                        return Ok(());
                    };
                    self.metrics.received.inc();

                    if self.buf.len() + line.len() + 2 > self.config.max_packet_size {
                        self.flush(&sockets).await;
                        delay.as_mut().reset(tokio::time::Instant::now() + self.config.max_delay);
                    }

                    self.buf.extend_from_slice(line.as_bytes());
                    self.buf.extend_from_slice(b"\r\n");
                }

                _ = delay.as_mut() => {
                    self.flush(&sockets).await;
                    delay.as_mut().reset(tokio::time::Instant::now() + self.config.max_delay);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "udp_forward_test.rs"]
mod udp_forward_test;
