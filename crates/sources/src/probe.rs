//! Outbound serial voltage prober
//!
//! Certain AIS transponders report their supply voltage only when asked.
//! The prober periodically writes a proprietary `$PSMT` solicitation to the
//! transponder's serial device; the answer arrives through the normal
//! inbound serial source. The sequence counter wraps at 10000.

use std::time::Duration;

use async_trait::async_trait;
use nmea_pipeline::Service;
use nmea_protocol::compose;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Default solicitation interval
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(60);

/// Periodically solicits a voltage report on a serial device
pub struct SerialProber {
    device: String,
    interval: Duration,
    counter: u32,
}

impl SerialProber {
    pub fn new(device: impl Into<String>, interval: Duration) -> Self {
        Self {
            device: device.into(),
            interval,
            counter: 1,
        }
    }
}

#[async_trait]
impl Service for SerialProber {
    fn name(&self) -> String {
        format!("probe/{}", self.device)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut device = tokio::fs::OpenOptions::new()
            .write(true)
            .open(&self.device)
            .await?;

        tracing::info!(device = %self.device, interval = ?self.interval, "voltage prober started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it so probes are spaced by
        // the full interval from startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    let line = compose::psmt_probe(self.counter);
                    device.write_all(format!("{line}\r\n").as_bytes()).await?;
                    device.flush().await?;
                    self.counter = (self.counter + 1) % 10000;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "probe_test.rs"]
mod probe_test;
