//! Tee metrics

use std::sync::Arc;

use nmea_metrics::{Counter, Exposition, MetricsProvider};

/// Counters for one tee
#[derive(Debug, Default)]
pub struct TeeMetrics {
    /// Lines read from the input channel
    pub read: Counter,

    /// Lines delivered to an output channel
    pub sent: Counter,

    /// Lines rejected by the prefix filter
    pub filter_skipped: Counter,

    /// Lines dropped because an output channel was full
    pub dropped: Counter,
}

impl TeeMetrics {
    pub const fn new() -> Self {
        Self {
            read: Counter::new(),
            sent: Counter::new(),
            filter_skipped: Counter::new(),
            dropped: Counter::new(),
        }
    }
}

/// Handle for reporting a tee's metrics
///
/// Remains valid after the tee has been consumed by the supervisor.
#[derive(Clone)]
pub struct TeeMetricsHandle {
    name: String,
    metrics: Arc<TeeMetrics>,
}

impl TeeMetricsHandle {
    pub(crate) fn new(name: String, metrics: Arc<TeeMetrics>) -> Self {
        Self { name, metrics }
    }
}

impl MetricsProvider for TeeMetricsHandle {
    fn collect(&self, out: &mut Exposition) {
        let labels = &[("tee", self.name.as_str())];
        out.counter("nmea_tee_messages_input_total", labels, self.metrics.read.get());
        out.counter("nmea_tee_messages_output_total", labels, self.metrics.sent.get());
        out.counter(
            "nmea_tee_messages_filter_skipped_total",
            labels,
            self.metrics.filter_skipped.get(),
        );
        out.counter(
            "nmea_tee_messages_dropped_total",
            labels,
            self.metrics.dropped.get(),
        );
    }
}
