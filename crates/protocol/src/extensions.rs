//! Live-instrument extensions snapshot
//!
//! A small map of instrument readings keyed by GPX extension name
//! (`waterdepth`, `heading`, ...). Values overwrite on update and carry the
//! capture time; stale entries are elided when the snapshot is rendered, not
//! when it is written.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// How long a reading stays visible after capture
pub const RETENTION: chrono::Duration = chrono::Duration::seconds(60);

/// Snapshot of the most recent instrument readings
///
/// Keys iterate in lexicographic order, which is also the order they render
/// into GPX `<extensions>` elements.
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    entries: BTreeMap<&'static str, Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    captured_at: DateTime<Utc>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading captured now
    pub fn set(&mut self, key: &'static str, value: String) {
        self.set_at(key, value, Utc::now());
    }

    /// Record a reading with an explicit capture time
    pub fn set_at(&mut self, key: &'static str, value: String, captured_at: DateTime<Utc>) {
        self.entries.insert(key, Entry { value, captured_at });
    }

    /// Iterate entries captured within [`RETENTION`] of `at`, in key order
    pub fn fresh_at(&self, at: DateTime<Utc>) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries
            .iter()
            .filter(move |(_, e)| at - e.captured_at <= RETENTION)
            .map(|(k, e)| (*k, e.value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up the raw value for a key, fresh or not
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites() {
        let mut exts = Extensions::new();
        exts.set("waterdepth", "3.2".into());
        exts.set("waterdepth", "4.1".into());
        assert_eq!(exts.len(), 1);
        assert_eq!(exts.get("waterdepth"), Some("4.1"));
    }

    #[test]
    fn stale_entries_are_elided_at_render() {
        let now = Utc::now();
        let mut exts = Extensions::new();
        exts.set_at("heading", "181".into(), now - chrono::Duration::seconds(61));
        exts.set_at("watertemp", "18.5".into(), now - chrono::Duration::seconds(59));

        let fresh: Vec<_> = exts.fresh_at(now).collect();
        assert_eq!(fresh, vec![("watertemp", "18.5")]);
        // The stale entry is still stored, only hidden
        assert_eq!(exts.len(), 2);
    }

    #[test]
    fn fresh_iteration_is_key_ordered() {
        let now = Utc::now();
        let mut exts = Extensions::new();
        exts.set_at("windspeed", "4.2".into(), now);
        exts.set_at("heading", "90".into(), now);
        exts.set_at("log", "120.0".into(), now);

        let keys: Vec<_> = exts.fresh_at(now).map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["heading", "log", "windspeed"]);
    }
}
