//! Pipeline plumbing
//!
//! The runtime graph is a tree of long-lived [`Service`]s connected by
//! bounded channels of validated lines. This crate provides the connective
//! tissue:
//!
//! - [`channel`] - the central bounded line channel between sources and the
//!   main tee
//! - [`Tee`] - non-blocking broadcast to any number of output channels, with
//!   an optional prefix filter
//! - [`Supervisor`] - runs services as tasks, restarts the ones that fail,
//!   cascades cancellation

mod metrics;
mod supervisor;
mod tee;

pub use metrics::{TeeMetrics, TeeMetricsHandle};
pub use supervisor::{Service, Supervisor, SupervisorEvent};
pub use tee::Tee;

use std::sync::Arc;

use tokio::sync::mpsc;

/// A validated line, shared across the fan-out without copying
pub type Line = Arc<str>;

/// Capacity of the central channel and of every tee output
///
/// Large enough to absorb short consumer hiccups; a consumer that falls
/// further behind loses lines at the tee rather than stalling its siblings.
pub const CHANNEL_CAPACITY: usize = 4096;

/// Create a bounded line channel with the pipeline's standard capacity
pub fn channel() -> (mpsc::Sender<Line>, mpsc::Receiver<Line>) {
    mpsc::channel(CHANNEL_CAPACITY)
}
