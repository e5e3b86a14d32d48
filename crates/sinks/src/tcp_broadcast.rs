//! TCP broadcast listener
//!
//! Replays every line to any number of inbound TCP clients. Two services
//! share the connection list under a nested supervisor: the acceptor adds
//! connections, the broadcaster writes to all of them with a one second
//! deadline per connection and evicts the ones that fail. Each connection is
//! written to by exactly one task at a time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nmea_metrics::{Counter, Exposition, MetricsProvider};
use nmea_pipeline::{Line, Service, Supervisor};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Per-connection write deadline
const WRITE_DEADLINE: Duration = Duration::from_secs(1);

type ConnList = Arc<Mutex<Vec<TcpStream>>>;

/// Broadcast counters
#[derive(Debug, Default)]
pub struct TcpBroadcastMetrics {
    /// Connections accepted over the lifetime of the listener
    pub incoming_connections: Counter,

    /// Line writes that succeeded, summed over connections
    pub forwarded_messages: Counter,

    /// Connections currently attached
    pub current_connections: AtomicU64,
}

/// Handle for reporting broadcast metrics
#[derive(Clone)]
pub struct TcpBroadcastMetricsHandle {
    address: String,
    metrics: Arc<TcpBroadcastMetrics>,
}

impl MetricsProvider for TcpBroadcastMetricsHandle {
    fn collect(&self, out: &mut Exposition) {
        let labels = &[("source", self.address.as_str())];
        out.counter(
            "nmea_tcp_incoming_connections_total",
            labels,
            self.metrics.incoming_connections.get(),
        );
        out.counter(
            "nmea_tcp_forwarded_messages_total",
            labels,
            self.metrics.forwarded_messages.get(),
        );
        out.gauge(
            "nmea_tcp_current_connections",
            labels,
            self.metrics.current_connections.load(Ordering::Relaxed) as f64,
        );
    }
}

/// The broadcast listener: a nested supervisor over acceptor and broadcaster
pub struct TcpBroadcast {
    address: String,
    supervisor: Supervisor,
    metrics: Arc<TcpBroadcastMetrics>,
}

impl TcpBroadcast {
    pub fn new(address: impl Into<String>, input: mpsc::Receiver<Line>) -> Self {
        let address = address.into();
        let conns = ConnList::default();
        let metrics = Arc::new(TcpBroadcastMetrics::default());

        let mut supervisor = Supervisor::new(format!("tcp-broadcast/{address}"));
        supervisor.add(Broadcaster {
            address: address.clone(),
            input,
            conns: Arc::clone(&conns),
            metrics: Arc::clone(&metrics),
        });
        supervisor.add(Acceptor {
            address: address.clone(),
            conns,
            metrics: Arc::clone(&metrics),
        });

        Self {
            address,
            supervisor,
            metrics,
        }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> TcpBroadcastMetricsHandle {
        TcpBroadcastMetricsHandle {
            address: self.address.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[async_trait]
impl Service for TcpBroadcast {
    fn name(&self) -> String {
        format!("forward/tcp({})", self.address)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        self.supervisor.run(cancel).await
    }
}

/// Writes each incoming line to every attached connection
struct Broadcaster {
    address: String,
    input: mpsc::Receiver<Line>,
    conns: ConnList,
    metrics: Arc<TcpBroadcastMetrics>,
}

#[async_trait]
impl Service for Broadcaster {
    fn name(&self) -> String {
        format!("tcp-broadcaster/{}", self.address)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                line = self.input.recv() => match line {
                    Some(line) => line,
                    None => return Ok(()),
                },
            };

            let mut message = Vec::with_capacity(line.len() + 1);
            message.extend_from_slice(line.as_bytes());
            message.push(b'\n');

            let mut conns = self.conns.lock().await;
            let mut i = 0;
            while i < conns.len() {
                let write = conns[i].write_all(&message);
                match tokio::time::timeout(WRITE_DEADLINE, write).await {
                    Ok(Ok(())) => {
                        self.metrics.forwarded_messages.inc();
                        i += 1;
                    }
                    timed_out_or_failed => {
                        let peer = conns[i]
                            .peer_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|_| "unknown".into());
                        tracing::info!(
                            address = %self.address,
                            peer = %peer,
                            timed_out = timed_out_or_failed.is_err(),
                            "dropping client connection"
                        );
                        drop(conns.remove(i));
                    }
                }
            }
            self.metrics
                .current_connections
                .store(conns.len() as u64, Ordering::Relaxed);
        }
    }
}

/// Accepts inbound connections and attaches them to the list
struct Acceptor {
    address: String,
    conns: ConnList,
    metrics: Arc<TcpBroadcastMetrics>,
}

#[async_trait]
impl Service for Acceptor {
    fn name(&self) -> String {
        format!("tcp-listener/{}", self.address)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        // A bare ":port" means all interfaces
        let bind_address = match self.address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => self.address.clone(),
        };
        let listener = TcpListener::bind(&bind_address).await?;
        tracing::info!(address = %self.address, "broadcast listener accepting connections");

        loop {
            let (stream, peer) = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                accepted = listener.accept() => accepted?,
            };

            tracing::info!(address = %self.address, peer = %peer, "client connected");
            let mut conns = self.conns.lock().await;
            conns.push(stream);
            self.metrics.incoming_connections.inc();
            self.metrics
                .current_connections
                .store(conns.len() as u64, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
#[path = "tcp_broadcast_test.rs"]
mod tcp_broadcast_test;
