//! Shared source metrics

use std::sync::Arc;

use nmea_metrics::{Counter, Exposition, MetricsProvider};
use nmea_protocol::Reject;

/// Per-source counters
///
/// One instance per source, labelled with the source name in the scrape
/// output. Rejections are classified the way the validator classifies them.
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Lines read from the transport, good or bad
    pub received: Counter,

    /// Bytes read from the transport
    pub bytes: Counter,

    /// Empty lines
    pub empty: Counter,

    /// Lines without NMEA framing
    pub non_nmea: Counter,

    /// Lines without a checksum suffix
    pub no_checksum: Counter,

    /// Lines with a checksum mismatch
    pub bad_checksum: Counter,
}

impl SourceMetrics {
    pub const fn new() -> Self {
        Self {
            received: Counter::new(),
            bytes: Counter::new(),
            empty: Counter::new(),
            non_nmea: Counter::new(),
            no_checksum: Counter::new(),
            bad_checksum: Counter::new(),
        }
    }

    /// Record a classified rejection
    #[inline]
    pub fn reject(&self, reject: Reject) {
        match reject {
            Reject::Empty => self.empty.inc(),
            Reject::NonNmea => self.non_nmea.inc(),
            Reject::NoChecksum => self.no_checksum.inc(),
            Reject::BadChecksum => self.bad_checksum.inc(),
        }
    }
}

/// Handle for reporting a source's metrics
///
/// Holds an `Arc` to the counters, so it remains valid after the source has
/// been handed to the supervisor.
#[derive(Clone)]
pub struct SourceMetricsHandle {
    name: String,
    metrics: Arc<SourceMetrics>,
}

impl SourceMetricsHandle {
    pub(crate) fn new(name: String, metrics: Arc<SourceMetrics>) -> Self {
        Self { name, metrics }
    }
}

impl MetricsProvider for SourceMetricsHandle {
    fn collect(&self, out: &mut Exposition) {
        let labels = &[("source", self.name.as_str())];
        out.counter(
            "nmea_input_messages_input_total",
            labels,
            self.metrics.received.get(),
        );
        out.counter("nmea_input_bytes_total", labels, self.metrics.bytes.get());
        out.counter(
            "nmea_input_messages_empty_total",
            labels,
            self.metrics.empty.get(),
        );
        out.counter(
            "nmea_input_messages_non_nmea_total",
            labels,
            self.metrics.non_nmea.get(),
        );
        out.counter(
            "nmea_input_messages_no_checksum_total",
            labels,
            self.metrics.no_checksum.get(),
        );
        out.counter(
            "nmea_input_messages_bad_total",
            labels,
            self.metrics.bad_checksum.get(),
        );
    }
}
