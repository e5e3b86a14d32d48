//! Gauges with a freshness window

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A gauge that is only visible while recently set
///
/// Instrument readings are meaningful for a few seconds; after that the
/// honest answer is absence, not a frozen last value. The gauge therefore
/// records when it was last set and reports a value only within its
/// time-to-live. Rendering decides visibility, so there are no expiry timers
/// to manage.
#[derive(Debug)]
pub struct LiveGauge {
    inner: Mutex<Option<(f64, Instant)>>,
    ttl: Duration,
}

impl LiveGauge {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(None),
            ttl,
        }
    }

    /// Set the value and restart the freshness window
    pub fn set(&self, value: f64) {
        *self.inner.lock().unwrap() = Some((value, Instant::now()));
    }

    /// The current value, if set within the freshness window
    pub fn value_if_fresh(&self) -> Option<f64> {
        let inner = *self.inner.lock().unwrap();
        inner
            .filter(|(_, at)| at.elapsed() <= self.ttl)
            .map(|(v, _)| v)
    }

    /// Clear the gauge regardless of freshness
    pub fn clear(&self) {
        *self.inner.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_value_is_visible() {
        let g = LiveGauge::new(Duration::from_secs(5));
        assert_eq!(g.value_if_fresh(), None);
        g.set(3.25);
        assert_eq!(g.value_if_fresh(), Some(3.25));
    }

    #[test]
    fn stale_value_is_hidden() {
        let g = LiveGauge::new(Duration::ZERO);
        g.set(1.0);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(g.value_if_fresh(), None);
    }

    #[test]
    fn set_refreshes_the_window() {
        let g = LiveGauge::new(Duration::from_millis(50));
        g.set(1.0);
        std::thread::sleep(Duration::from_millis(30));
        g.set(2.0);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(g.value_if_fresh(), Some(2.0));
    }

    #[test]
    fn clear_hides_the_value() {
        let g = LiveGauge::new(Duration::from_secs(5));
        g.set(1.0);
        g.clear();
        assert_eq!(g.value_if_fresh(), None);
    }
}
