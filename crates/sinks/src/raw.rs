//! Rolling raw recorder
//!
//! Writes the validated stream to disk verbatim, one file per truncated
//! wall-clock window. Rotation happens lazily when a line arrives in a new
//! window; the old chain is finalised and a new file is created from the
//! pattern-substituted name. A synthetic `VRZDA` time stamp is interleaved
//! at most once per UTC second, and only in seconds that also carry data.
//!
//! Buffered data is flushed through to disk on a timer so a crash loses
//! minutes, not hours. On cancellation the current file is flushed and
//! closed cleanly.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use nmea_metrics::{Counter, Exposition, MetricsProvider};
use nmea_pipeline::{Line, Service};
use nmea_protocol::compose;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::util::{ChainWrite, ChainWriter, GzipWriter, PlainTextWriter};

/// Recorder configuration
#[derive(Debug, Clone)]
pub struct RawRecorderConfig {
    /// strftime-style pattern for new file names, evaluated against the
    /// current UTC time; parent directories are created as needed
    pub pattern: String,

    /// Write buffer size
    pub buffer_size: usize,

    /// Wall-clock window per file
    pub window: Duration,

    /// Gzip the output
    pub compress: bool,

    /// How often buffered data is pushed to disk
    pub flush_interval: Duration,
}

impl Default for RawRecorderConfig {
    fn default() -> Self {
        Self {
            pattern: "nmea-raw.%Y%m%d-%H%M%S.gz".into(),
            buffer_size: 128 * 1024,
            window: Duration::from_secs(24 * 60 * 60),
            compress: true,
            flush_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Recorder counters
#[derive(Debug, Default)]
pub struct RawRecorderMetrics {
    /// Data lines written
    pub recorded: Counter,

    /// Files created over the recorder's lifetime
    pub files_created: Counter,
}

/// Handle for reporting recorder metrics
#[derive(Clone)]
pub struct RawRecorderMetricsHandle {
    metrics: Arc<RawRecorderMetrics>,
}

impl MetricsProvider for RawRecorderMetricsHandle {
    fn collect(&self, out: &mut Exposition) {
        out.counter(
            "nmea_raw_recorded_total",
            &[],
            self.metrics.recorded.get(),
        );
        out.counter(
            "nmea_raw_files_created_total",
            &[],
            self.metrics.files_created.get(),
        );
    }
}

/// Writes the raw stream to rotated files
pub struct RawRecorder {
    config: RawRecorderConfig,
    input: mpsc::Receiver<Line>,
    chain: Box<dyn ChainWriter>,
    metrics: Arc<RawRecorderMetrics>,

    /// Open output and the truncated window it belongs to
    current: Option<(Box<dyn ChainWrite>, i64)>,

    /// Unix second of the last VRZDA emitted
    last_zda: i64,
}

impl RawRecorder {
    pub fn new(config: RawRecorderConfig, input: mpsc::Receiver<Line>) -> Self {
        let chain: Box<dyn ChainWriter> = if config.compress {
            Box::new(GzipWriter::new(config.buffer_size))
        } else {
            Box::new(PlainTextWriter::new(config.buffer_size))
        };
        Self {
            config,
            input,
            chain,
            metrics: Arc::new(RawRecorderMetrics::default()),
            current: None,
            last_zda: -1,
        }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> RawRecorderMetricsHandle {
        RawRecorderMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Write one data line, rotating and time-stamping as needed
    fn write_line(&mut self, now: DateTime<Utc>, line: &str) -> anyhow::Result<()> {
        let now_sec = now.timestamp();
        let window_secs = self.config.window.as_secs().max(1) as i64;
        let now_window = now_sec - now_sec.rem_euclid(window_secs);

        if self
            .current
            .as_ref()
            .map_or(true, |(_, window)| *window != now_window)
        {
            self.rotate(now, now_window)?;
        }
        let (out, _) = self.current.as_mut().expect("rotate leaves a file open");

        if now_sec != self.last_zda {
            let zda = compose::vrzda(now);
            out.write_all(zda.as_bytes())?;
            out.write_all(b"\r\n")?;
            self.last_zda = now_sec;
        }

        out.write_all(line.as_bytes())?;
        out.write_all(b"\r\n")?;
        self.metrics.recorded.inc();
        Ok(())
    }

    /// Close the current file and open the one for the new window
    fn rotate(&mut self, now: DateTime<Utc>, window: i64) -> anyhow::Result<()> {
        self.close()?;

        let at = now.with_nanosecond(0).unwrap_or(now);
        let name = at.format(&self.config.pattern).to_string();
        tracing::info!(file = %name, "creating raw file");

        if let Some(parent) = Path::new(&name).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(&name)?;
        let out = self.chain.wrap(file)?;
        self.current = Some((out, window));
        self.metrics.files_created.inc();
        Ok(())
    }

    /// Flush and finalise the current file, if any
    fn close(&mut self) -> anyhow::Result<()> {
        if let Some((out, _)) = self.current.take() {
            out.finish()?;
        }
        Ok(())
    }
}

#[async_trait]
impl Service for RawRecorder {
    fn name(&self) -> String {
        format!("record/raw({:?})", self.config.pattern)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut flusher = tokio::time::interval(self.config.flush_interval);
        flusher.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        flusher.tick().await; // the immediate first tick

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.close()?;
                    return Ok(());
                }

                line = self.input.recv() => {
                    let Some(line) = line else {
                        self.close()?;
                        return Ok(());
                    };
                    if let Err(e) = self.write_line(Utc::now(), &line) {
                        // Leave no half-written chain behind before the restart
                        let _ = self.close();
                        return Err(e);
                    }
                }

                _ = flusher.tick() => {
                    if let Some((out, _)) = self.current.as_mut() {
                        out.flush_all()?;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "raw_test.rs"]
mod raw_test;
