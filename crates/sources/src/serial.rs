//! Serial and stdin sources
//!
//! A serial device is read as a plain character stream: open the path
//! read-only and let the line pump do the rest. There is no idle deadline;
//! instruments legitimately go quiet when the boat does. Stdin works the
//! same way, except that EOF means the feed is finished rather than broken.

use std::sync::Arc;

use async_trait::async_trait;
use nmea_pipeline::{Line, Service};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{SourceMetrics, SourceMetricsHandle};
use crate::pump::LinePump;
use crate::SourceError;

/// Reads NMEA text from a serial device path
pub struct SerialSource {
    device: String,
    pump: LinePump,
    metrics: Arc<SourceMetrics>,
}

impl SerialSource {
    pub fn new(device: impl Into<String>, sender: mpsc::Sender<Line>) -> Self {
        let device = device.into();
        let metrics = Arc::new(SourceMetrics::new());
        let pump = LinePump::new(device.clone(), sender, Arc::clone(&metrics), None);
        Self {
            device,
            pump,
            metrics,
        }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle::new(self.device.clone(), Arc::clone(&self.metrics))
    }
}

#[async_trait]
impl Service for SerialSource {
    fn name(&self) -> String {
        format!("source/serial/{}", self.device)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let file = tokio::fs::File::open(&self.device).await?;
        tracing::info!(device = %self.device, "serial source open");
        self.pump.run(file, &cancel).await?;
        Ok(())
    }
}

/// Reads NMEA text from standard input
pub struct StdinSource {
    pump: LinePump,
    metrics: Arc<SourceMetrics>,
}

impl StdinSource {
    pub fn new(sender: mpsc::Sender<Line>) -> Self {
        let metrics = Arc::new(SourceMetrics::new());
        let pump = LinePump::new("stdin".into(), sender, Arc::clone(&metrics), None);
        Self { pump, metrics }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle::new("stdin".into(), Arc::clone(&self.metrics))
    }
}

#[async_trait]
impl Service for StdinSource {
    fn name(&self) -> String {
        "source/stdin".into()
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        match self.pump.run(tokio::io::stdin(), &cancel).await {
            // Stdin closing is a normal end of input, not a failure to retry
            Err(SourceError::Eof) => Ok(()),
            other => Ok(other?),
        }
    }
}

#[cfg(test)]
#[path = "serial_test.rs"]
mod serial_test;
