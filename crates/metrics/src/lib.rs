//! Metrics primitives and the scrape endpoint
//!
//! Components keep their own counters and gauges and implement
//! [`MetricsProvider`] to emit them into an [`Exposition`]. A process-wide
//! [`Registry`] collects the providers; the [`MetricsServer`] renders the
//! registry as a Prometheus-style text page on every scrape.
//!
//! There is no background reporting machinery: gauges carry their own
//! freshness window ([`LiveGauge`]), so staleness is decided at render time
//! and a stale gauge simply disappears from the page.

mod exposition;
mod live;
mod server;

pub use exposition::Exposition;
pub use live::LiveGauge;
pub use server::{MetricsServer, MetricsServerError};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A monotonically increasing counter
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Anything that can contribute samples to a scrape
pub trait MetricsProvider: Send + Sync {
    fn collect(&self, out: &mut Exposition);
}

/// Process-wide collection of metric providers
///
/// Cheap to clone; components receive a handle rather than reaching for a
/// global.
#[derive(Clone, Default)]
pub struct Registry {
    providers: Arc<Mutex<Vec<Arc<dyn MetricsProvider>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to every future scrape
    pub fn register(&self, provider: Arc<dyn MetricsProvider>) {
        self.providers.lock().unwrap().push(provider);
    }

    /// Render all providers into one text page
    pub fn render(&self) -> String {
        let mut out = Exposition::new();
        for provider in self.providers.lock().unwrap().iter() {
            provider.collect(&mut out);
        }
        out.into_string()
    }
}
