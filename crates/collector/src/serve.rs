//! Pipeline construction and lifecycle
//!
//! Builds the runtime graph from the configuration:
//!
//! ```text
//! sources -> central channel -> main tee -> raw recorder
//!                                        -> udp forward (all)
//!                                        -> AIS tee -> udp forward (AIS)
//!                                                   -> tcp listen (AIS)
//!                                        -> "$" tee -> gpx recorder
//!                                        -> instruments store
//!                                        -> AIS contacts counter
//!                                        -> tcp listen (all)
//! ```
//!
//! Every component is a child of the root supervisor. SIGINT/SIGTERM cancel
//! the root token; the supervisor waits for every child to wind down, which
//! closes raw files and GPX sessions cleanly.

use anyhow::Result;
use async_trait::async_trait;
use nmea_config::Config;
use nmea_instruments::{AisContactsCounter, InstrumentsStore};
use nmea_metrics::{MetricsServer, Registry};
use nmea_pipeline::{Service, Supervisor, Tee};
use nmea_sinks::gpx::{AutoGpxConfig, GpxCollector};
use nmea_sinks::{RawRecorder, RawRecorderConfig, TcpBroadcast, UdpForwarder, UdpForwarderConfig};
use nmea_sources::{
    HttpSource, SerialProber, SerialSource, StdinSource, TcpSource, UdpSource,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Build and run the pipeline until a termination signal arrives
pub async fn run(config: Config) -> Result<()> {
    let registry = Registry::new();
    let mut supervisor = build(&config, &registry)?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    supervisor.run(cancel).await?;
    tracing::info!("shutdown complete");
    Ok(())
}

/// Assemble the supervisor tree for this configuration
pub fn build(config: &Config, registry: &Registry) -> Result<Supervisor> {
    let mut supervisor = Supervisor::new("main");

    let (lines, lines_rx) = nmea_pipeline::channel();
    let mut tee = Tee::new("main", lines_rx);
    registry.register(Arc::new(tee.metrics_handle()));

    // Sources

    if config.input.stdin {
        tracing::info!("reading NMEA from stdin");
        let source = StdinSource::new(lines.clone());
        registry.register(Arc::new(source.metrics_handle()));
        supervisor.add(source);
    }

    for addr in &config.input.tcp_connect {
        tracing::info!(address = %addr, "reading NMEA over TCP");
        let source = TcpSource::new(addr.clone(), lines.clone());
        registry.register(Arc::new(source.metrics_handle()));
        supervisor.add(source);
    }

    for port in &config.input.udp_listen {
        tracing::info!(port, "reading NMEA on UDP");
        let source = UdpSource::new(*port, lines.clone());
        registry.register(Arc::new(source.metrics_handle()));
        supervisor.add(source);
    }

    for port in &config.input.http_listen {
        tracing::info!(port, "reading NMEA from HTTP POSTs");
        let source = HttpSource::new(*port, lines.clone());
        registry.register(Arc::new(source.metrics_handle()));
        supervisor.add(source);
    }

    for device in &config.input.serial {
        tracing::info!(device = %device, "reading NMEA from serial device");
        let source = SerialSource::new(device.clone(), lines.clone());
        registry.register(Arc::new(source.metrics_handle()));
        supervisor.add(source);
    }

    for device in &config.probe.serial {
        tracing::info!(device = %device, "probing for supply voltage");
        supervisor.add(SerialProber::new(device.clone(), config.probe.interval));
    }

    // Consumers

    if !config.listen.tcp_all.is_empty() {
        tracing::info!(address = %config.listen.tcp_all, "replaying NMEA to TCP clients");
        let broadcast = TcpBroadcast::new(config.listen.tcp_all.clone(), tee.output());
        registry.register(Arc::new(broadcast.metrics_handle()));
        supervisor.add(broadcast);
    }

    if !config.forward.udp_all.destinations.is_empty() {
        tracing::info!(
            destinations = ?config.forward.udp_all.destinations,
            "forwarding NMEA over UDP"
        );
        let forwarder = UdpForwarder::new(
            UdpForwarderConfig {
                destinations: config.forward.udp_all.destinations.clone(),
                max_packet_size: config.forward.udp_all.max_packet_size,
                max_delay: config.forward.udp_all.max_delay,
            },
            tee.output(),
        );
        registry.register(Arc::new(forwarder.metrics_handle()));
        supervisor.add(forwarder);
    }

    let want_ais_udp = !config.forward.udp_ais.destinations.is_empty();
    let want_ais_tcp = !config.listen.tcp_ais.is_empty();
    if want_ais_udp || want_ais_tcp {
        let mut ais = Tee::filtered("AIS", tee.output(), "!AI");
        registry.register(Arc::new(ais.metrics_handle()));

        if want_ais_udp {
            tracing::info!(
                destinations = ?config.forward.udp_ais.destinations,
                "forwarding AIS over UDP"
            );
            let forwarder = UdpForwarder::new(
                UdpForwarderConfig {
                    destinations: config.forward.udp_ais.destinations.clone(),
                    max_packet_size: config.forward.udp_ais.max_packet_size,
                    max_delay: config.forward.udp_ais.max_delay,
                },
                ais.output(),
            );
            registry.register(Arc::new(forwarder.metrics_handle()));
            supervisor.add(forwarder);
        }

        if want_ais_tcp {
            tracing::info!(address = %config.listen.tcp_ais, "replaying AIS to TCP clients");
            let broadcast = TcpBroadcast::new(config.listen.tcp_ais.clone(), ais.output());
            registry.register(Arc::new(broadcast.metrics_handle()));
            supervisor.add(broadcast);
        }

        supervisor.add(ais);
    }

    let instruments = InstrumentsStore::new(tee.output());
    let instruments_handle = instruments.handle();
    registry.register(Arc::new(instruments_handle.clone()));
    supervisor.add(instruments);

    let contacts = AisContactsCounter::new(tee.output());
    registry.register(Arc::new(contacts.handle()));
    supervisor.add(contacts);

    if !config.metrics.listen.is_empty() {
        tracing::info!(
            address = %format!("http://{}/metrics", config.metrics.listen),
            "exporting instruments and metrics"
        );
        supervisor.add(MetricsService(MetricsServer::new(
            config.metrics.listen.clone(),
            registry.clone(),
        )));
    }

    if !config.raw.pattern.is_empty() {
        tracing::info!(pattern = %config.raw.pattern, "recording raw NMEA");
        let recorder = RawRecorder::new(
            RawRecorderConfig {
                pattern: config.raw.pattern.clone(),
                buffer_size: config.raw.buffer_size,
                window: config.raw.time_window,
                compress: !config.raw.uncompressed,
                flush_interval: config.raw.flush_interval,
            },
            tee.output(),
        );
        registry.register(Arc::new(recorder.metrics_handle()));
        supervisor.add(recorder);
    }

    if !config.gpx.pattern.is_empty() {
        tracing::info!(pattern = %config.gpx.pattern, "collecting GPX tracks");
        let mut talker = Tee::filtered("non-AIS", tee.output(), "$");
        registry.register(Arc::new(talker.metrics_handle()));

        let extensions = {
            let handle = instruments_handle.clone();
            Box::new(move || handle.gpx_extensions())
        };
        let gpx = GpxCollector::new(
            talker.output(),
            AutoGpxConfig {
                sample_interval: config.gpx.sample_interval,
                trigger_distance_m: config.gpx.trigger_distance_m,
                trigger_window: config.gpx.trigger_window,
                cooldown_window: config.gpx.cooldown_window,
            },
            config.gpx.pattern.clone(),
            extensions,
        );
        registry.register(Arc::new(gpx.metrics_handle()));
        supervisor.add(gpx);

        supervisor.add(talker);
    }

    supervisor.add(tee);

    // The central channel sender stays alive inside the sources; when no
    // source is configured, dropping the last clone here lets the tee see a
    // closed channel rather than idle forever. Harmless either way.
    drop(lines);

    Ok(supervisor)
}

/// Cancel the token on SIGINT or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::error!(error = %e, "installing SIGTERM handler");
                    let _ = ctrl_c.await;
                    cancel.cancel();
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => tracing::info!("interrupt received, shutting down"),
            _ = terminate.recv() => tracing::info!("terminated, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("interrupt received, shutting down");
    }

    cancel.cancel();
}

/// Adapter running the metrics endpoint under the supervisor
struct MetricsService(MetricsServer);

#[async_trait]
impl Service for MetricsService {
    fn name(&self) -> String {
        "metrics".into()
    }

    async fn serve(&mut self, cancel: CancellationToken) -> Result<()> {
        self.0.run(cancel).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "serve_test.rs"]
mod serve_test;
