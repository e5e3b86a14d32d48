//! HTTP POST source
//!
//! Listens on a port and accepts NMEA text POSTed to any path. Request
//! bodies are consumed as streams, so long-running chunked uploads work as
//! live feeds. Concurrent requests interleave into the central channel; a
//! body ending without a final terminator still delivers its last line.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use futures_util::StreamExt;
use nmea_pipeline::{Line, Service};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::{SourceMetrics, SourceMetricsHandle};
use crate::pump::{LinePump, LineSplitter};
use crate::SourceError;

/// Accepts POSTed line streams
pub struct HttpSource {
    port: u16,
    state: Arc<HttpState>,
}

struct HttpState {
    pump: LinePump,
    cancel: CancellationToken,
}

impl HttpSource {
    pub fn new(port: u16, sender: mpsc::Sender<Line>) -> Self {
        let metrics = Arc::new(SourceMetrics::new());
        let pump = LinePump::new(format!("http/{port}"), sender, Arc::clone(&metrics), None);
        Self {
            port,
            state: Arc::new(HttpState {
                pump,
                // Replaced with the serve-time token before the listener starts
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle::new(
            format!("http/{}", self.port),
            Arc::clone(self.state.pump.metrics()),
        )
    }
}

#[async_trait]
impl Service for HttpSource {
    fn name(&self) -> String {
        format!("source/http/{}", self.port)
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        let address = format!(":{}", self.port);
        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.port))
            .await
            .map_err(|e| SourceError::Bind {
                address,
                source: e,
            })?;

        tracing::info!(port = self.port, "HTTP source listening");

        // Hand the serve-time token to request handlers
        let state = Arc::new(HttpState {
            pump: self.state.pump.clone(),
            cancel: cancel.clone(),
        });

        let app = Router::new()
            .route("/", post(ingest))
            .fallback(ingest)
            .with_state(state);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        tracing::info!(port = self.port, "HTTP source stopped");
        Ok(())
    }
}

/// Stream one request body through the splitter
async fn ingest(State(state): State<Arc<HttpState>>, body: Body) -> StatusCode {
    let mut stream = body.into_data_stream();
    let mut splitter = LineSplitter::new();

    loop {
        // Long-running uploads must not hold up shutdown
        let chunk = tokio::select! {
            _ = state.cancel.cancelled() => return StatusCode::SERVICE_UNAVAILABLE,
            chunk = stream.next() => chunk,
        };
        let chunk = match chunk {
            None => break,
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "HTTP body read error");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
        };
        state.pump.metrics().bytes.add(chunk.len() as u64);
        splitter.extend(&chunk);

        loop {
            match splitter.next_line() {
                Ok(Some(line)) => {
                    if state.pump.publish(line, &state.cancel).await.is_err() {
                        return StatusCode::SERVICE_UNAVAILABLE;
                    }
                }
                Ok(None) => break,
                Err(SourceError::LineTooLong(_)) => return StatusCode::PAYLOAD_TOO_LARGE,
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    if let Some(rest) = splitter.take_remainder() {
        if state.pump.publish(rest, &state.cancel).await.is_err() {
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    }

    StatusCode::OK
}

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;
