use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener as ProbeListener;

use super::*;

const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

async fn free_port() -> u16 {
    let probe = ProbeListener::bind("127.0.0.1:0").await.unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);
    port
}

fn line(s: &str) -> Line {
    Line::from(s)
}

#[tokio::test]
async fn replays_lines_to_every_client() {
    let port = free_port().await;
    let (tx, rx) = nmea_pipeline::channel();
    let mut broadcast = TcpBroadcast::new(format!(":{port}"), rx);
    let metrics = broadcast.metrics_handle();
    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { broadcast.serve(cancel).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let client_a = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let client_b = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    // Let the acceptor attach both before broadcasting
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    tx.send(line(RMC)).await.unwrap();
    tx.send(line("$GPDPT,3.2,0.0*00")).await.unwrap();

    for client in [client_a, client_b] {
        let mut reader = BufReader::new(client);
        let mut got = String::new();
        reader.read_line(&mut got).await.unwrap();
        assert_eq!(got, format!("{RMC}\n"));
        got.clear();
        reader.read_line(&mut got).await.unwrap();
        assert_eq!(got, "$GPDPT,3.2,0.0*00\n");
    }

    cancel.cancel();
    task.await.unwrap().unwrap();

    let mut page = nmea_metrics::Exposition::new();
    use nmea_metrics::MetricsProvider;
    metrics.collect(&mut page);
    let page = page.into_string();
    assert!(page.contains(&format!(
        "nmea_tcp_incoming_connections_total{{source=\":{port}\"}} 2"
    )));
}

#[tokio::test]
async fn closed_client_is_evicted_and_siblings_survive() {
    let port = free_port().await;
    let (tx, rx) = nmea_pipeline::channel();
    let mut broadcast = TcpBroadcast::new(format!(":{port}"), rx);
    let metrics = broadcast.metrics_handle();
    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { broadcast.serve(cancel).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let doomed = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let survivor = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    drop(doomed);

    // The first write may still land in the dead client's buffers; keep
    // sending until the eviction happens.
    let mut reader = BufReader::new(survivor);
    for _ in 0..10 {
        tx.send(line("$X*00")).await.unwrap();
        let mut got = String::new();
        reader.read_line(&mut got).await.unwrap();
        assert_eq!(got, "$X*00\n");
        if metrics.metrics.current_connections.load(Ordering::Relaxed) == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(metrics.metrics.current_connections.load(Ordering::Relaxed), 1);

    cancel.cancel();
    task.await.unwrap().unwrap();
}
