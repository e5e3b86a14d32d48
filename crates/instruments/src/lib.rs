//! Live instruments and AIS contact accounting
//!
//! The [`InstrumentsStore`] turns the `$`-talker stream into a set of live
//! gauges for scraping and an extensions snapshot for GPX track points. The
//! [`AisContactsCounter`] keeps per-class sets of recently heard MMSIs and
//! publishes their cardinality.

mod ais_contacts;
mod store;
mod window;

pub use ais_contacts::{AisContactsCounter, AisContactsHandle};
pub use store::{InstrumentsHandle, InstrumentsStore};
pub use window::SlidingWindow;
