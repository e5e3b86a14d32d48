//! GPX track recording
//!
//! [`AutoGpx`] is the movement-triggered state machine; [`GpxCollector`] is
//! the service feeding it. The collector consumes the `$`-filtered stream,
//! samples position from RMC fixes (using the fix's own date and time, not
//! the wall clock) and attaches the current instrument extensions to every
//! sample. Five minutes without a fix closes any open session, as does
//! cancellation.

mod track;

pub use track::{AutoGpx, AutoGpxConfig, Opener};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nmea_metrics::{Counter, Exposition, MetricsProvider};
use nmea_pipeline::{Line, Service};
use nmea_protocol::{Extensions, Sentence};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Session close deadline after the last RMC fix
const RMC_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Provides the extensions snapshot attached to each sample
pub type ExtensionsFn = Box<dyn Fn() -> Extensions + Send>;

/// Collector counters
#[derive(Debug, Default)]
pub struct GpxMetrics {
    /// Lines seen on the input channel
    pub input_messages: Counter,

    /// Lines of types outside the vocabulary
    pub unsupported_messages: Counter,

    /// Lines that failed to parse
    pub bad_messages: Counter,

    /// RMC fixes offered to the recorder
    pub sampled_positions: Counter,

    /// Samples the recorder retained
    pub recorded_positions: Counter,

    /// Track files created
    pub files_created: Counter,
}

/// Handle for reporting collector metrics
#[derive(Clone)]
pub struct GpxMetricsHandle {
    metrics: Arc<GpxMetrics>,
}

impl MetricsProvider for GpxMetricsHandle {
    fn collect(&self, out: &mut Exposition) {
        let m = &self.metrics;
        out.counter("nmea_gpx_input_messages_total", &[], m.input_messages.get());
        out.counter(
            "nmea_gpx_unsupported_messages_total",
            &[],
            m.unsupported_messages.get(),
        );
        out.counter("nmea_gpx_bad_messages_total", &[], m.bad_messages.get());
        out.counter(
            "nmea_gpx_sampled_positions_total",
            &[],
            m.sampled_positions.get(),
        );
        out.counter(
            "nmea_gpx_record_positions_total",
            &[],
            m.recorded_positions.get(),
        );
        out.counter("nmea_gpx_files_created_total", &[], m.files_created.get());
    }
}

/// Feeds RMC fixes from the line stream into the track recorder
pub struct GpxCollector {
    input: mpsc::Receiver<Line>,
    track: AutoGpx,
    extensions: ExtensionsFn,
    metrics: Arc<GpxMetrics>,
}

impl GpxCollector {
    /// Build a collector writing pattern-named files
    ///
    /// `pattern` is a strftime-style file name evaluated against the session
    /// start time; parent directories are created as needed.
    pub fn new(
        input: mpsc::Receiver<Line>,
        config: AutoGpxConfig,
        pattern: impl Into<String>,
        extensions: ExtensionsFn,
    ) -> Self {
        let metrics = Arc::new(GpxMetrics::default());
        let opener = pattern_opener(pattern.into(), Arc::clone(&metrics));
        Self {
            input,
            track: AutoGpx::new(config, opener),
            extensions,
            metrics,
        }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> GpxMetricsHandle {
        GpxMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    fn handle_line(&mut self, line: &str) -> bool {
        self.metrics.input_messages.inc();
        let rmc = match Sentence::parse(line) {
            Ok(Sentence::Rmc(rmc)) => rmc,
            Ok(_) => return false,
            Err(e) if e.is_unsupported() => {
                self.metrics.unsupported_messages.inc();
                return false;
            }
            Err(_) => {
                self.metrics.bad_messages.inc();
                return false;
            }
        };

        // A receiver without a fix reports 0,0; not a place boats go
        if rmc.latitude == 0.0 && rmc.longitude == 0.0 {
            return false;
        }

        self.metrics.sampled_positions.inc();
        if self
            .track
            .sample(rmc.latitude, rmc.longitude, rmc.when, (self.extensions)())
        {
            self.metrics.recorded_positions.inc();
        }
        true
    }
}

#[async_trait]
impl Service for GpxCollector {
    fn name(&self) -> String {
        "record/gpx".into()
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let rmc_deadline = tokio::time::sleep(RMC_TIMEOUT);
        tokio::pin!(rmc_deadline);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.track.flush();
                    return Ok(());
                }

                line = self.input.recv() => {
                    let Some(line) = line else {
                        self.track.flush();
                        return Ok(());
                    };
                    if self.handle_line(&line) {
                        rmc_deadline
                            .as_mut()
                            .reset(tokio::time::Instant::now() + RMC_TIMEOUT);
                    }
                }

                _ = rmc_deadline.as_mut() => {
                    // Position feed went quiet; close out any open track
                    self.track.flush();
                    rmc_deadline
                        .as_mut()
                        .reset(tokio::time::Instant::now() + RMC_TIMEOUT);
                }
            }
        }
    }
}

/// Opener creating files from a time-substituted pattern
fn pattern_opener(pattern: String, metrics: Arc<GpxMetrics>) -> Opener {
    Box::new(move |when: DateTime<Utc>| {
        let name = when.format(&pattern).to_string();
        tracing::info!(file = %name, "creating track file");
        if let Some(parent) = Path::new(&name).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(&name)?;
        metrics.files_created.inc();
        Ok(Box::new(file) as Box<dyn std::io::Write + Send>)
    })
}
