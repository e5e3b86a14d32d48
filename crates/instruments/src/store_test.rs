use super::*;

fn store() -> (InstrumentsStore, InstrumentsHandle) {
    let (_tx, rx) = nmea_pipeline::channel();
    let store = InstrumentsStore::new(rx);
    let handle = store.handle();
    (store, handle)
}

fn page(handle: &InstrumentsHandle) -> String {
    let mut out = Exposition::new();
    handle.collect(&mut out);
    out.into_string()
}

#[test]
fn xdr_updates_three_instruments() {
    let (store, handle) = store();
    store.handle_line("$YDXDR,C,4.4,C,Air,P,98950,P,Baro,C,5.4,C,ENV_INSIDE_T*1E");

    let page = page(&handle);
    assert!(page.contains("nmea_instruments_air_temperature_c 4.4"));
    assert!(page.contains("nmea_instruments_barometric_pressure_mb 989.5"));
    assert!(page.contains("nmea_instruments_inside_temperature_c 5.4"));

    let exts = handle.gpx_extensions();
    assert_eq!(exts.get("airtemperature"), Some("4.4"));
    assert_eq!(exts.get("baropressure"), Some("989.5"));
    assert_eq!(exts.get("insidetemperature"), Some("5.4"));
}

#[test]
fn depth_heading_and_temperature_gauges() {
    let (store, handle) = store();
    store.handle_line("$SDDPT,3.2,0.0*00");
    store.handle_line("$IIHDG,271.5,,,5.1,W*00");
    store.handle_line("$IIMTW,18.5,C*00");
    store.handle_line("$IIVLW,1234.5,N,12.3,N*00");
    store.handle_line("$IIVHW,,T,,M,6.2,N,11.5,K*00");

    let page = page(&handle);
    assert!(page.contains("nmea_instruments_water_depth_m 3.2"));
    assert!(page.contains("nmea_instruments_compass_heading 271.5"));
    assert!(page.contains("nmea_instruments_water_temperature_c 18.5"));
    assert!(page.contains("nmea_instruments_total_log_distance_nm 1234.5"));
    assert!(page.contains("nmea_instruments_water_speed_kn 6.2"));

    let exts = handle.gpx_extensions();
    assert_eq!(exts.get("waterdepth"), Some("3.2"));
    assert_eq!(exts.get("heading"), Some("272"));
    assert_eq!(exts.get("watertemp"), Some("18.5"));
    assert_eq!(exts.get("log"), Some("1234.5"));
    assert_eq!(exts.get("waterspeed"), Some("6.2"));
}

#[test]
fn valid_apparent_wind_feeds_gauges_and_window() {
    let (store, handle) = store();
    store.handle_line("$IIMWV,271.0,R,4.0,M,A*00");
    store.handle_line("$IIMWV,10.0,R,8.0,M,A*00");
    store.handle_line("$IIMWV,12.0,R,6.0,M,A*00");

    let page = page(&handle);
    // Normalised angle from the last reading
    assert!(page.contains("nmea_instruments_apparent_wind_angle 12"));
    assert!(page.contains("nmea_instruments_apparent_wind_speed_mps 6"));
    assert!(page.contains("nmea_instruments_apparent_wind_speed_min_mps 4"));
    assert!(page.contains("nmea_instruments_apparent_wind_speed_median_mps 6"));
    assert!(page.contains("nmea_instruments_apparent_wind_speed_max_mps 8"));

    let exts = handle.gpx_extensions();
    assert_eq!(exts.get("windangle"), Some("12"));
    assert_eq!(exts.get("windspeed"), Some("6.0"));
}

#[test]
fn true_or_invalid_wind_is_ignored() {
    let (store, handle) = store();
    store.handle_line("$IIMWV,10.0,T,4.0,M,A*00");
    store.handle_line("$IIMWV,10.0,R,4.0,M,V*00");

    let page = page(&handle);
    assert!(!page.contains("apparent_wind"));
    assert!(handle.gpx_extensions().get("windspeed").is_none());
}

#[test]
fn valid_gll_publishes_the_position_pair() {
    let (store, handle) = store();
    store.handle_line("$GPGLL,5900.000,N,01800.000,E,123519,A*22");

    let page = page(&handle);
    assert!(page.contains("nmea_instruments_gps_position{axis=\"lat\"} 59"));
    assert!(page.contains("nmea_instruments_gps_position{axis=\"lon\"} 18"));
}

#[test]
fn invalid_gll_is_ignored() {
    let (store, handle) = store();
    store.handle_line("$GPGLL,5900.000,N,01800.000,E,123519,V*00");
    assert!(!page(&handle).contains("gps_position"));
}

#[test]
fn pcdin_battery_voltage() {
    let (store, handle) = store();
    store.handle_line("$PCDIN,01F214,47B319FE,55,00C8040000FFFFC4*51");

    assert!(page(&handle).contains("nmea_instruments_battery_voltage 12.24"));
    assert_eq!(handle.gpx_extensions().get("batteryvoltage"), Some("12.2"));
}

#[test]
fn pcdin_other_pgns_are_ignored() {
    let (store, handle) = store();
    store.handle_line("$PCDIN,01F200,47B319FE,55,00C8040000FFFFC4*00");
    assert!(!page(&handle).contains("battery_voltage"));
}

#[test]
fn extensions_snapshot_is_a_defensive_copy() {
    let (store, handle) = store();
    store.handle_line("$SDDPT,3.2,0.0*00");

    let snapshot = handle.gpx_extensions();
    store.handle_line("$SDDPT,9.9,0.0*00");

    assert_eq!(snapshot.get("waterdepth"), Some("3.2"));
    assert_eq!(handle.gpx_extensions().get("waterdepth"), Some("9.9"));
}

#[test]
fn unparseable_lines_are_ignored() {
    let (store, handle) = store();
    store.handle_line("$GPXXX,1,2,3*00");
    store.handle_line("not a sentence");
    assert!(!page(&handle).contains("nmea_instruments_water_depth_m"));
}

#[tokio::test]
async fn serve_consumes_the_stream() {
    let (tx, rx) = nmea_pipeline::channel();
    let mut store = InstrumentsStore::new(rx);
    let handle = store.handle();

    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { store.serve(cancel).await })
    };

    tx.send(Line::from("$SDDPT,3.2,0.0*00")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(page(&handle).contains("nmea_instruments_water_depth_m 3.2"));

    cancel.cancel();
    task.await.unwrap().unwrap();
}
