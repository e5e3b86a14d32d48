//! Movement-triggered GPX track writer
//!
//! Keeps a short, time-ordered history of position samples and opens a track
//! file when the boat has moved more than the trigger distance across the
//! trigger window. The session closes again once displacement across the
//! cooldown window falls below the same threshold, so a boat swinging at
//! anchor does not produce endless one-point tracks.
//!
//! Distances use an equirectangular approximation: minutes of arc scaled to
//! meters, no cosine-latitude correction. Deliberately crude; the thresholds
//! are tens of meters and mid-latitude. Change the formula and the
//! thresholds together or not at all.

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use nmea_protocol::Extensions;

/// GPX header opening a single track segment
const HEADER: &str = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1" xmlns:nmc="https://calmh.dev/nmea-collect/"><trk><trkseg>"#;

/// Matching footer
const FOOTER: &str = "</trkseg></trk></gpx>";

/// Opens the output for a new session starting at the given time
pub type Opener = Box<dyn FnMut(DateTime<Utc>) -> std::io::Result<Box<dyn Write + Send>> + Send>;

/// Track recorder configuration
#[derive(Debug, Clone)]
pub struct AutoGpxConfig {
    /// Minimum wall-clock gap between two recorded points
    pub sample_interval: Duration,

    /// Displacement that starts (and sustains) a session
    pub trigger_distance_m: f64,

    /// Window over which displacement starts a session
    pub trigger_window: Duration,

    /// Window over which lack of displacement ends a session
    pub cooldown_window: Duration,
}

impl Default for AutoGpxConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(10),
            trigger_distance_m: 25.0,
            trigger_window: Duration::from_secs(60),
            cooldown_window: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone)]
struct Sample {
    lat: f64,
    lon: f64,
    when: DateTime<Utc>,
    extensions: Extensions,
}

impl Sample {
    /// Render as a `<trkpt>` element
    ///
    /// Extensions are filtered against the sample's own timestamp, so a
    /// point replayed at session start keeps the instrument values that were
    /// fresh when the fix was taken. The `<extensions>` element is omitted
    /// when nothing is fresh.
    fn gpx(&self) -> String {
        let mut ext = String::new();
        for (key, value) in self.extensions.fresh_at(self.when) {
            ext.push_str(&format!("<nmc:{key}>{value}</nmc:{key}>"));
        }
        let ext = if ext.is_empty() {
            ext
        } else {
            format!("<extensions>{ext}</extensions>")
        };
        format!(
            r#"<trkpt lat="{:.6}" lon="{:.6}"><time>{}</time>{ext}</trkpt>"#,
            self.lat,
            self.lon,
            self.when.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

/// Movement-triggered track recorder
pub struct AutoGpx {
    sample_interval: chrono::Duration,
    trigger_distance_m: f64,
    trigger_window: chrono::Duration,
    cooldown_window: chrono::Duration,
    opener: Opener,
    samples: Vec<Sample>,
    destination: Option<Box<dyn Write + Send>>,
}

impl AutoGpx {
    pub fn new(config: AutoGpxConfig, opener: Opener) -> Self {
        let chronoize =
            |d: Duration| chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX);
        Self {
            sample_interval: chronoize(config.sample_interval),
            trigger_distance_m: config.trigger_distance_m,
            trigger_window: chronoize(config.trigger_window),
            cooldown_window: chronoize(config.cooldown_window),
            opener,
            samples: Vec::new(),
            destination: None,
        }
    }

    /// True while a session file is open
    pub fn recording(&self) -> bool {
        self.destination.is_some()
    }

    /// Offer a position sample; returns whether it was retained
    ///
    /// Sub-sample-interval points are dropped. Otherwise the sample joins
    /// the history and either starts a session (displacement across the
    /// trigger window strictly above the threshold), sustains one, or ends
    /// one (displacement across the cooldown window below the threshold).
    pub fn sample(
        &mut self,
        lat: f64,
        lon: f64,
        when: DateTime<Utc>,
        extensions: Extensions,
    ) -> bool {
        let s = Sample {
            lat,
            lon,
            when,
            extensions,
        };

        if self.samples.is_empty() {
            self.samples.push(s);
            return true;
        }

        let since_last = when - self.samples[self.samples.len() - 1].when;
        if since_last < self.sample_interval {
            return false;
        }

        self.samples.push(s);
        let latest = self.samples.len() - 1;

        if self.destination.is_none() {
            // Keep only the trigger window of history; a sample exactly at
            // the window edge still counts
            let cutoff = when - self.trigger_window;
            let keep = self.first_at_or_after(cutoff);
            self.samples.drain(..keep);

            let d = distance_m(&self.samples[0], &self.samples[self.samples.len() - 1]);
            if d > self.trigger_distance_m {
                self.start_recording(when);
            }
            return true;
        }

        // Recording: stop if the boat has not moved across the cooldown
        // window
        let cutoff = when - self.cooldown_window;
        if let Some(old) = self.latest_at_or_before(cutoff) {
            if distance_m(old, &self.samples[latest]) < self.trigger_distance_m {
                self.stop_recording();
                return true;
            }
        }

        let s = self.samples[latest].clone();
        self.record(&s);

        // Trim history to the cooldown window, keeping one sample strictly
        // older than it for the next displacement check
        let keep = self.first_at_or_after(cutoff).saturating_sub(1);
        if keep > 0 {
            self.samples.drain(..keep);
        }

        true
    }

    /// Close any open session
    pub fn flush(&mut self) {
        if self.destination.is_some() {
            self.stop_recording();
        }
    }

    fn start_recording(&mut self, when: DateTime<Utc>) {
        let mut destination = match (self.opener)(when) {
            Ok(destination) => destination,
            Err(e) => {
                // Skip this session; the next trigger will retry
                tracing::warn!(error = %e, "opening track file");
                return;
            }
        };

        if let Err(e) = writeln!(destination, "{HEADER}") {
            tracing::warn!(error = %e, "writing track file");
            return;
        }
        for s in &self.samples {
            if let Err(e) = writeln!(destination, "{}", s.gpx()) {
                tracing::warn!(error = %e, "writing track file");
                return;
            }
        }
        self.destination = Some(destination);
    }

    fn record(&mut self, s: &Sample) {
        if let Some(destination) = self.destination.as_mut() {
            if let Err(e) = writeln!(destination, "{}", s.gpx()) {
                tracing::warn!(error = %e, "writing track file");
            }
        }
    }

    fn stop_recording(&mut self) {
        let Some(mut destination) = self.destination.take() else {
            return;
        };
        if let Err(e) = writeln!(destination, "{FOOTER}") {
            tracing::warn!(error = %e, "writing track file");
        }
        if let Err(e) = destination.flush() {
            tracing::warn!(error = %e, "closing track file");
        }
        self.samples.clear();
    }

    /// Newest sample at or before `t`
    fn latest_at_or_before(&self, t: DateTime<Utc>) -> Option<&Sample> {
        let idx = self.samples.partition_point(|s| s.when <= t);
        idx.checked_sub(1).map(|i| &self.samples[i])
    }

    /// Index of the oldest sample at or after `t`
    fn first_at_or_after(&self, t: DateTime<Utc>) -> usize {
        self.samples.partition_point(|s| s.when < t)
    }
}

/// Equirectangular distance in meters
///
/// Minutes of arc across both axes, scaled by the nautical mile.
fn distance_m(a: &Sample, b: &Sample) -> f64 {
    let dlat = (a.lat - b.lat).abs();
    let dlon = (a.lon - b.lon).abs();
    (dlat * dlat + dlon * dlon).sqrt() * 60.0 * 1852.0
}

#[cfg(test)]
#[path = "track_test.rs"]
mod track_test;
