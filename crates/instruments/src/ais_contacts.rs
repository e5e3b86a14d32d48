//! AIS contact accounting
//!
//! Tracks which MMSIs have been heard recently, split by transponder class:
//! class A position reports (message IDs 1-3) and class B (message ID 18).
//! Contacts expire five minutes after they were last heard. The account
//! pass runs after every insert and on a minute tick, so the published
//! cardinality never trails reality by more than a minute even in silence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nmea_metrics::{Exposition, MetricsProvider};
use nmea_pipeline::{Line, Service};
use nmea_protocol::{ais, Sentence};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How long a contact stays counted after it was last heard
const CONTACT_RETENTION: Duration = Duration::from_secs(5 * 60);

/// Cadence of the background account pass
const ACCOUNT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Default)]
struct Contacts {
    class_a: Mutex<HashMap<u32, Instant>>,
    class_b: Mutex<HashMap<u32, Instant>>,
    count_a: AtomicU64,
    count_b: AtomicU64,
}

/// Handle for reporting contact cardinalities
#[derive(Clone)]
pub struct AisContactsHandle {
    contacts: Arc<Contacts>,
}

impl MetricsProvider for AisContactsHandle {
    fn collect(&self, out: &mut Exposition) {
        out.gauge(
            "nmea_ais_contacts_5min",
            &[("class", "A")],
            self.contacts.count_a.load(Ordering::Relaxed) as f64,
        );
        out.gauge(
            "nmea_ais_contacts_5min",
            &[("class", "B")],
            self.contacts.count_b.load(Ordering::Relaxed) as f64,
        );
    }
}

/// Counts distinct AIS contacts per class over a trailing window
pub struct AisContactsCounter {
    input: mpsc::Receiver<Line>,
    contacts: Arc<Contacts>,
    retention: Duration,
}

impl AisContactsCounter {
    pub fn new(input: mpsc::Receiver<Line>) -> Self {
        Self::with_retention(input, CONTACT_RETENTION)
    }

    fn with_retention(input: mpsc::Receiver<Line>, retention: Duration) -> Self {
        Self {
            input,
            contacts: Arc::new(Contacts::default()),
            retention,
        }
    }

    /// Get a metrics handle for reporting
    pub fn handle(&self) -> AisContactsHandle {
        AisContactsHandle {
            contacts: Arc::clone(&self.contacts),
        }
    }

    fn handle_line(&self, line: &str) {
        let Ok(Sentence::Vdm(vdm)) = Sentence::parse(line) else {
            return;
        };
        // Only single-fragment messages carry a decodable header here
        if vdm.num_fragments > 1 {
            return;
        }
        let Some(header) = ais::decode_header(&vdm.payload) else {
            return;
        };

        match header.message_id {
            1..=3 => {
                self.contacts
                    .class_a
                    .lock()
                    .unwrap()
                    .insert(header.user_id, Instant::now());
            }
            18 => {
                self.contacts
                    .class_b
                    .lock()
                    .unwrap()
                    .insert(header.user_id, Instant::now());
            }
            _ => return,
        }
        self.account();
    }

    /// Expire stale contacts and publish the cardinalities
    fn account(&self) {
        let retention = self.retention;
        let mut class_a = self.contacts.class_a.lock().unwrap();
        class_a.retain(|_, last_seen| last_seen.elapsed() <= retention);
        self.contacts
            .count_a
            .store(class_a.len() as u64, Ordering::Relaxed);
        drop(class_a);

        let mut class_b = self.contacts.class_b.lock().unwrap();
        class_b.retain(|_, last_seen| last_seen.elapsed() <= retention);
        self.contacts
            .count_b
            .store(class_b.len() as u64, Ordering::Relaxed);
    }
}

#[async_trait]
impl Service for AisContactsCounter {
    fn name(&self) -> String {
        "ais-contacts".into()
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(ACCOUNT_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await; // the immediate first tick

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),

                line = self.input.recv() => match line {
                    Some(line) => self.handle_line(&line),
                    None => return Ok(()),
                },

                _ = ticker.tick() => self.account(),
            }
        }
    }
}

#[cfg(test)]
#[path = "ais_contacts_test.rs"]
mod ais_contacts_test;
