//! Live instruments store
//!
//! Consumes the `$`-talker stream and keeps, per recognised quantity, a live
//! gauge for scraping plus a stringified extensions entry for GPX track
//! points. Instrument gauges are visible for five seconds after their last
//! update; the GPS position pair gets a minute. Wind speed additionally
//! feeds a sliding minute window published as min/median/max gauges.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nmea_metrics::{Exposition, LiveGauge, MetricsProvider};
use nmea_pipeline::{Line, Service};
use nmea_protocol::{Extensions, Sentence};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::window::SlidingWindow;

/// Visibility window for instrument gauges
const GAUGE_TTL: Duration = Duration::from_secs(5);

/// Visibility window for the position pair
const POSITION_TTL: Duration = Duration::from_secs(60);

/// Period of the wind speed statistic
const WIND_WINDOW: Duration = Duration::from_secs(60);

struct Gauges {
    water_depth: LiveGauge,
    heading: LiveGauge,
    water_temp: LiveGauge,
    wind_angle: LiveGauge,
    wind_speed: LiveGauge,
    wind_speed_min: LiveGauge,
    wind_speed_med: LiveGauge,
    wind_speed_max: LiveGauge,
    log_distance: LiveGauge,
    water_speed: LiveGauge,
    battery_voltage: LiveGauge,
    air_temp: LiveGauge,
    inside_temp: LiveGauge,
    baro_pressure: LiveGauge,
    position_lat: LiveGauge,
    position_lon: LiveGauge,
}

impl Gauges {
    fn new() -> Self {
        Self {
            water_depth: LiveGauge::new(GAUGE_TTL),
            heading: LiveGauge::new(GAUGE_TTL),
            water_temp: LiveGauge::new(GAUGE_TTL),
            wind_angle: LiveGauge::new(GAUGE_TTL),
            wind_speed: LiveGauge::new(GAUGE_TTL),
            wind_speed_min: LiveGauge::new(GAUGE_TTL),
            wind_speed_med: LiveGauge::new(GAUGE_TTL),
            wind_speed_max: LiveGauge::new(GAUGE_TTL),
            log_distance: LiveGauge::new(GAUGE_TTL),
            water_speed: LiveGauge::new(GAUGE_TTL),
            battery_voltage: LiveGauge::new(GAUGE_TTL),
            air_temp: LiveGauge::new(GAUGE_TTL),
            inside_temp: LiveGauge::new(GAUGE_TTL),
            baro_pressure: LiveGauge::new(GAUGE_TTL),
            position_lat: LiveGauge::new(POSITION_TTL),
            position_lon: LiveGauge::new(POSITION_TTL),
        }
    }
}

struct Shared {
    gauges: Gauges,
    extensions: Mutex<Extensions>,
    wind_window: Mutex<SlidingWindow>,
}

/// Shared view of the store: extensions snapshot and metrics
///
/// Cheap to clone; stays valid after the store itself has been handed to the
/// supervisor.
#[derive(Clone)]
pub struct InstrumentsHandle {
    shared: Arc<Shared>,
}

impl InstrumentsHandle {
    /// A defensive copy of the current extensions snapshot
    pub fn gpx_extensions(&self) -> Extensions {
        self.shared.extensions.lock().unwrap().clone()
    }
}

impl MetricsProvider for InstrumentsHandle {
    fn collect(&self, out: &mut Exposition) {
        let g = &self.shared.gauges;
        let plain: [(&str, &LiveGauge); 14] = [
            ("nmea_instruments_water_depth_m", &g.water_depth),
            ("nmea_instruments_compass_heading", &g.heading),
            ("nmea_instruments_water_temperature_c", &g.water_temp),
            ("nmea_instruments_apparent_wind_angle", &g.wind_angle),
            ("nmea_instruments_apparent_wind_speed_mps", &g.wind_speed),
            (
                "nmea_instruments_apparent_wind_speed_min_mps",
                &g.wind_speed_min,
            ),
            (
                "nmea_instruments_apparent_wind_speed_median_mps",
                &g.wind_speed_med,
            ),
            (
                "nmea_instruments_apparent_wind_speed_max_mps",
                &g.wind_speed_max,
            ),
            ("nmea_instruments_total_log_distance_nm", &g.log_distance),
            ("nmea_instruments_water_speed_kn", &g.water_speed),
            ("nmea_instruments_battery_voltage", &g.battery_voltage),
            ("nmea_instruments_air_temperature_c", &g.air_temp),
            ("nmea_instruments_inside_temperature_c", &g.inside_temp),
            ("nmea_instruments_barometric_pressure_mb", &g.baro_pressure),
        ];
        for (name, gauge) in plain {
            if let Some(value) = gauge.value_if_fresh() {
                out.gauge(name, &[], value);
            }
        }
        if let (Some(lat), Some(lon)) = (
            g.position_lat.value_if_fresh(),
            g.position_lon.value_if_fresh(),
        ) {
            out.gauge("nmea_instruments_gps_position", &[("axis", "lat")], lat);
            out.gauge("nmea_instruments_gps_position", &[("axis", "lon")], lon);
        }
    }
}

/// The store service
pub struct InstrumentsStore {
    input: mpsc::Receiver<Line>,
    shared: Arc<Shared>,
}

impl InstrumentsStore {
    pub fn new(input: mpsc::Receiver<Line>) -> Self {
        Self {
            input,
            shared: Arc::new(Shared {
                gauges: Gauges::new(),
                extensions: Mutex::new(Extensions::new()),
                wind_window: Mutex::new(SlidingWindow::new(WIND_WINDOW)),
            }),
        }
    }

    /// Get the shared handle (extensions access and metrics provider)
    pub fn handle(&self) -> InstrumentsHandle {
        InstrumentsHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    fn handle_line(&self, line: &str) {
        let Ok(sentence) = Sentence::parse(line) else {
            return;
        };

        let g = &self.shared.gauges;
        let ext = |key, value: String| {
            self.shared.extensions.lock().unwrap().set(key, value);
        };

        match sentence {
            Sentence::Dpt(dpt) => {
                g.water_depth.set(dpt.depth);
                ext("waterdepth", format!("{:.1}", dpt.depth));
            }

            Sentence::Hdg(hdg) => {
                g.heading.set(hdg.heading);
                ext("heading", format!("{:.0}", hdg.heading));
            }

            Sentence::Mtw(mtw) => {
                g.water_temp.set(mtw.temperature);
                ext("watertemp", format!("{:.1}", mtw.temperature));
            }

            Sentence::Mwv(mwv) if mwv.is_valid_apparent() => {
                g.wind_angle.set(mwv.angle);
                g.wind_speed.set(mwv.speed);

                let (min, med, max) = {
                    let mut window = self.shared.wind_window.lock().unwrap();
                    window.observe(mwv.speed);
                    window.min_median_max()
                };
                g.wind_speed_min.set(min);
                g.wind_speed_med.set(med);
                g.wind_speed_max.set(max);

                ext("windangle", format!("{:.0}", mwv.angle));
                ext("windspeed", format!("{:.1}", mwv.speed));
            }
            Sentence::Mwv(_) => {}

            Sentence::Vlw(vlw) => {
                g.log_distance.set(vlw.total_distance_nm);
                ext("log", format!("{:.1}", vlw.total_distance_nm));
            }

            Sentence::Vhw(vhw) => {
                g.water_speed.set(vhw.speed_through_water_knots);
                ext(
                    "waterspeed",
                    format!("{:.1}", vhw.speed_through_water_knots),
                );
            }

            Sentence::Gll(gll) if gll.validity == "A" => {
                g.position_lat.set(gll.latitude);
                g.position_lon.set(gll.longitude);
            }
            Sentence::Gll(_) => {}

            Sentence::Xdr(xdr) => {
                for m in &xdr.measurements {
                    match (m.transducer_type.as_str(), m.name.as_str()) {
                        ("C", "Air") => {
                            g.air_temp.set(m.value);
                            ext("airtemperature", format!("{:.1}", m.value));
                        }
                        ("C", "ENV_INSIDE_T") => {
                            g.inside_temp.set(m.value);
                            ext("insidetemperature", format!("{:.1}", m.value));
                        }
                        ("P", "Baro") => {
                            let value = m.value / 100.0;
                            g.baro_pressure.set(value);
                            ext("baropressure", format!("{:.1}", value));
                        }
                        _ => {}
                    }
                }
            }

            Sentence::Pcdin(din) => {
                if let Some(voltage) = din.battery_voltage() {
                    g.battery_voltage.set(voltage);
                    ext("batteryvoltage", format!("{:.1}", voltage));
                }
            }

            Sentence::Rmc(_) | Sentence::Vdm(_) => {}
        }
    }
}

#[async_trait]
impl Service for InstrumentsStore {
    fn name(&self) -> String {
        "instruments".into()
    }

    async fn serve(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                line = self.input.recv() => match line {
                    Some(line) => self.handle_line(&line),
                    None => return Ok(()),
                },
            }
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
