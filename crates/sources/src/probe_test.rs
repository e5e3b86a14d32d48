use std::time::Duration;

use super::*;

#[tokio::test]
async fn writes_probe_sentences_with_incrementing_counter() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let mut prober = SerialProber::new(path.clone(), Duration::from_millis(10));
    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { prober.serve(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    task.await.unwrap().unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = written.lines().collect();
    assert!(lines.len() >= 2, "expected several probes, got {lines:?}");
    assert_eq!(lines[0], "$PSMT,0,0,0x00000000,1,vin,1*23");
    for line in &lines {
        nmea_protocol::validate(line).unwrap();
    }
    // Counters increment in sequence
    assert!(lines[1].contains(",vin,2*"));
}

#[tokio::test]
async fn missing_device_is_an_error() {
    let mut prober = SerialProber::new("/nonexistent/ttyS99", Duration::from_millis(10));
    assert!(prober.serve(CancellationToken::new()).await.is_err());
}
