//! TCP connect source
//!
//! Dials a remote NMEA server and reads raw CR/LF-separated text. The dial
//! and every read carry a 15 second deadline; a quiet or dead peer ends the
//! serve and the supervisor redials after its backoff.

use std::sync::Arc;

use async_trait::async_trait;
use nmea_pipeline::{Line, Service};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{SourceMetrics, SourceMetricsHandle};
use crate::pump::LinePump;
use crate::{SourceError, READ_IDLE_TIMEOUT};

/// Reads NMEA text from an outbound TCP connection
pub struct TcpSource {
    address: String,
    pump: LinePump,
    metrics: Arc<SourceMetrics>,
}

impl TcpSource {
    pub fn new(address: impl Into<String>, sender: mpsc::Sender<Line>) -> Self {
        let address = address.into();
        let metrics = Arc::new(SourceMetrics::new());
        let pump = LinePump::new(
            format!("tcp/{address}"),
            sender,
            Arc::clone(&metrics),
            Some(READ_IDLE_TIMEOUT),
        );
        Self {
            address,
            pump,
            metrics,
        }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle::new(format!("tcp/{}", self.address), Arc::clone(&self.metrics))
    }
}

#[async_trait]
impl Service for TcpSource {
    fn name(&self) -> String {
        format!("source/tcp/{}", self.address)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let connect = TcpStream::connect(&self.address);
        let stream = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            stream = tokio::time::timeout(READ_IDLE_TIMEOUT, connect) => {
                stream
                    .map_err(|_| SourceError::Dial {
                        address: self.address.clone(),
                        source: std::io::ErrorKind::TimedOut.into(),
                    })?
                    .map_err(|e| SourceError::Dial {
                        address: self.address.clone(),
                        source: e,
                    })?
            }
        };

        tracing::info!(address = %self.address, "TCP source connected");
        self.pump.run(stream, &cancel).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tcp_test.rs"]
mod tcp_test;
