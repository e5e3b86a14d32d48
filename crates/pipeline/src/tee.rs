//! Line broadcast with optional prefix filtering
//!
//! The tee reads validated lines from its input channel and fans each one
//! out to every registered output with a non-blocking send. A full output
//! loses the line (counted as a drop) while its siblings still receive it;
//! one slow consumer never stalls the rest. Order within one output always
//! matches input order.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::metrics::{TeeMetrics, TeeMetricsHandle};
use crate::supervisor::Service;
use crate::{Line, CHANNEL_CAPACITY};

/// Broadcasts an input channel to N output channels
pub struct Tee {
    name: String,
    input: mpsc::Receiver<Line>,
    prefix: Option<String>,
    outputs: Vec<mpsc::Sender<Line>>,
    metrics: Arc<TeeMetrics>,
}

impl Tee {
    /// An unfiltered tee
    pub fn new(name: impl Into<String>, input: mpsc::Receiver<Line>) -> Self {
        Self {
            name: name.into(),
            input,
            prefix: None,
            outputs: Vec::new(),
            metrics: Arc::new(TeeMetrics::new()),
        }
    }

    /// A tee passing only lines starting with `prefix`
    pub fn filtered(
        name: impl Into<String>,
        input: mpsc::Receiver<Line>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::new(name, input)
        }
    }

    /// Register a new output channel
    ///
    /// Must be called before the tee is handed to the supervisor; each output
    /// is owned exclusively by its consumer.
    pub fn output(&mut self) -> mpsc::Receiver<Line> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.outputs.push(tx);
        rx
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> TeeMetricsHandle {
        TeeMetricsHandle::new(self.name.clone(), Arc::clone(&self.metrics))
    }
}

#[async_trait]
impl Service for Tee {
    fn name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("tee/{}({prefix:?})", self.name),
            None => format!("tee/{}", self.name),
        }
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                line = self.input.recv() => match line {
                    Some(line) => line,
                    // All senders gone; nothing more will arrive
                    None => return Ok(()),
                },
            };

            self.metrics.read.inc();

            if let Some(prefix) = &self.prefix {
                if !line.starts_with(prefix.as_str()) {
                    self.metrics.filter_skipped.inc();
                    continue;
                }
            }

            for output in &self.outputs {
                match output.try_send(Arc::clone(&line)) {
                    Ok(()) => self.metrics.sent.inc(),
                    Err(TrySendError::Full(_)) => {
                        self.metrics.dropped.inc();
                        tracing::trace!(tee = %self.name, "output full, dropping line");
                    }
                    Err(TrySendError::Closed(_)) => {
                        self.metrics.dropped.inc();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tee_test.rs"]
mod tee_test;
