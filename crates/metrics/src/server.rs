//! Scrape HTTP endpoint
//!
//! A minimal axum server answering any GET with the rendered registry. The
//! original exposes its metrics on every path, which turns out to be handy
//! when pointing ad-hoc tooling at it; that behaviour is kept via a fallback
//! route.

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::Registry;

/// Scrape endpoint errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsServerError {
    /// Failed to bind the listen address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Server I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP listener serving the metrics page
#[derive(Clone)]
pub struct MetricsServer {
    address: String,
    registry: Registry,
}

impl MetricsServer {
    pub fn new(address: impl Into<String>, registry: Registry) -> Self {
        Self {
            address: address.into(),
            registry,
        }
    }

    /// Serve scrapes until cancelled
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), MetricsServerError> {
        let listener =
            TcpListener::bind(&self.address)
                .await
                .map_err(|e| MetricsServerError::Bind {
                    address: self.address.clone(),
                    source: e,
                })?;

        tracing::info!(address = %self.address, "metrics endpoint listening");

        self.serve_listener(listener, cancel).await?;

        tracing::info!(address = %self.address, "metrics endpoint stopped");
        Ok(())
    }

    async fn serve_listener(
        &self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), MetricsServerError> {
        let app = Router::new()
            .route("/metrics", get(scrape))
            .fallback(scrape)
            .with_state(self.registry.clone());

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;
        Ok(())
    }
}

async fn scrape(State(registry): State<Registry>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        registry.render(),
    )
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
