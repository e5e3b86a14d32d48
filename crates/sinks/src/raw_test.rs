use std::io::Read;

use chrono::TimeZone;
use flate2::read::GzDecoder;

use super::*;

const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

fn plain_config(dir: &Path, pattern: &str, window: Duration) -> RawRecorderConfig {
    RawRecorderConfig {
        pattern: dir.join(pattern).to_str().unwrap().to_string(),
        buffer_size: 1024,
        window,
        compress: false,
        flush_interval: Duration::from_secs(300),
    }
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

#[test]
fn interleaves_vrzda_once_per_second() {
    let dir = tempfile::tempdir().unwrap();
    let (_tx, rx) = nmea_pipeline::channel();
    let mut recorder = RawRecorder::new(
        plain_config(dir.path(), "raw.log", Duration::from_secs(3600)),
        rx,
    );

    let t = at(2024, 1, 1, 12, 0, 0);
    recorder.write_line(t, RMC).unwrap();
    recorder.write_line(t, "$GPDPT,3.2,0.0*00").unwrap();
    recorder
        .write_line(t + chrono::Duration::seconds(1), "$GPDPT,3.3,0.0*00")
        .unwrap();
    recorder.close().unwrap();

    let contents = std::fs::read_to_string(dir.path().join("raw.log")).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(
        lines,
        vec![
            "$VRZDA,120000.00,01,01,2024,00,00*72",
            RMC,
            "$GPDPT,3.2,0.0*00",
            "$VRZDA,120001.00,01,01,2024,00,00*73",
            "$GPDPT,3.3,0.0*00",
        ]
    );
    // Every line is CR/LF terminated
    assert_eq!(contents.matches("\r\n").count(), 5);
}

#[test]
fn rotates_when_the_window_changes() {
    let dir = tempfile::tempdir().unwrap();
    let (_tx, rx) = nmea_pipeline::channel();
    let mut recorder = RawRecorder::new(
        plain_config(dir.path(), "raw-%Y%m%d-%H.log", Duration::from_secs(3600)),
        rx,
    );
    let metrics = recorder.metrics_handle();

    recorder.write_line(at(2024, 1, 1, 12, 59, 59), RMC).unwrap();
    recorder.write_line(at(2024, 1, 1, 13, 0, 1), RMC).unwrap();
    recorder.close().unwrap();

    let first = std::fs::read_to_string(dir.path().join("raw-20240101-12.log")).unwrap();
    let second = std::fs::read_to_string(dir.path().join("raw-20240101-13.log")).unwrap();

    // Each file carries its own time stamp plus the data line
    assert_eq!(first.lines().count(), 2);
    assert!(first.starts_with("$VRZDA,125959.00,01,01,2024,00,00*"));
    assert_eq!(second.lines().count(), 2);
    assert!(second.starts_with("$VRZDA,130001.00,01,01,2024,00,00*"));

    let mut page = nmea_metrics::Exposition::new();
    metrics.collect(&mut page);
    let page = page.into_string();
    assert!(page.contains("nmea_raw_files_created_total 2"));
    assert!(page.contains("nmea_raw_recorded_total 2"));
}

#[test]
fn no_rotation_within_one_window() {
    let dir = tempfile::tempdir().unwrap();
    let (_tx, rx) = nmea_pipeline::channel();
    let mut recorder = RawRecorder::new(
        plain_config(dir.path(), "raw-%Y%m%d-%H%M%S.log", Duration::from_secs(3600)),
        rx,
    );

    recorder.write_line(at(2024, 1, 1, 12, 0, 5), RMC).unwrap();
    recorder.write_line(at(2024, 1, 1, 12, 30, 0), RMC).unwrap();
    recorder.write_line(at(2024, 1, 1, 12, 59, 59), RMC).unwrap();
    recorder.close().unwrap();

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn gzip_file_reads_back_in_arrival_order() {
    let dir = tempfile::tempdir().unwrap();
    let (_tx, rx) = nmea_pipeline::channel();
    let mut config = plain_config(dir.path(), "raw.gz", Duration::from_secs(3600));
    config.compress = true;
    let mut recorder = RawRecorder::new(config, rx);

    let t = at(2024, 6, 1, 8, 0, 0);
    let data: Vec<String> = (0..50).map(|i| format!("$GPDPT,{i}.0,0.0*00")).collect();
    for (i, line) in data.iter().enumerate() {
        recorder
            .write_line(t + chrono::Duration::milliseconds(100 * i as i64), line)
            .unwrap();
    }
    recorder.close().unwrap();

    let mut decoder = GzDecoder::new(std::fs::File::open(dir.path().join("raw.gz")).unwrap());
    let mut contents = String::new();
    decoder.read_to_string(&mut contents).unwrap();

    // Recorded data lines come back in arrival order, VRZDAs interleaved
    let recorded: Vec<_> = contents
        .lines()
        .filter(|l| !l.starts_with("$VRZDA"))
        .collect();
    assert_eq!(recorded, data.iter().map(String::as_str).collect::<Vec<_>>());
    let zdas = contents.lines().filter(|l| l.starts_with("$VRZDA")).count();
    assert_eq!(zdas, 5); // 50 samples at 100 ms span five distinct seconds
}

#[tokio::test]
async fn serve_closes_cleanly_on_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = nmea_pipeline::channel();
    let mut config = plain_config(dir.path(), "raw.gz", Duration::from_secs(3600));
    config.compress = true;
    let mut recorder = RawRecorder::new(config, rx);

    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { recorder.serve(cancel).await })
    };

    tx.send(Line::from(RMC)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    task.await.unwrap().unwrap();

    // The gzip stream is properly terminated
    let mut decoder = GzDecoder::new(std::fs::File::open(dir.path().join("raw.gz")).unwrap());
    let mut contents = String::new();
    decoder.read_to_string(&mut contents).unwrap();
    assert!(contents.contains(RMC));
}
