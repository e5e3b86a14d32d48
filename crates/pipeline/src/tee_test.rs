use std::time::Duration;

use tokio::sync::mpsc;

use super::*;

fn line(s: &str) -> Line {
    Line::from(s)
}

async fn run_tee(mut tee: Tee) -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tee.serve(cancel).await.unwrap();
        })
    };
    (cancel, handle)
}

#[tokio::test]
async fn broadcasts_to_all_outputs_in_order() {
    let (tx, rx) = mpsc::channel(16);
    let mut tee = Tee::new("main", rx);
    let mut out_a = tee.output();
    let mut out_b = tee.output();

    let (cancel, handle) = run_tee(tee).await;

    tx.send(line("$A*00")).await.unwrap();
    tx.send(line("$B*00")).await.unwrap();

    for out in [&mut out_a, &mut out_b] {
        assert_eq!(out.recv().await.unwrap().as_ref(), "$A*00");
        assert_eq!(out.recv().await.unwrap().as_ref(), "$B*00");
    }

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn prefix_filter_skips_non_matching_lines() {
    let (tx, rx) = mpsc::channel(16);
    let mut tee = Tee::filtered("ais", rx, "!AI");
    let metrics = tee.metrics_handle();
    let mut out = tee.output();

    let (cancel, handle) = run_tee(tee).await;

    tx.send(line("$GPRMC,x*00")).await.unwrap();
    tx.send(line("!AIVDM,1,1,,A,x,0*00")).await.unwrap();

    assert_eq!(out.recv().await.unwrap().as_ref(), "!AIVDM,1,1,,A,x,0*00");

    cancel.cancel();
    handle.await.unwrap();

    let mut page = nmea_metrics::Exposition::new();
    use nmea_metrics::MetricsProvider;
    metrics.collect(&mut page);
    let page = page.into_string();
    assert!(page.contains("nmea_tee_messages_input_total{tee=\"ais\"} 2"));
    assert!(page.contains("nmea_tee_messages_filter_skipped_total{tee=\"ais\"} 1"));
    assert!(page.contains("nmea_tee_messages_output_total{tee=\"ais\"} 1"));
}

#[tokio::test]
async fn full_output_drops_without_stalling_siblings() {
    let total = CHANNEL_CAPACITY + 10;
    let (tx, rx) = mpsc::channel(total + 16);
    let mut tee = Tee::new("main", rx);
    let metrics = tee.metrics_handle();
    let _slow = tee.output(); // never drained
    let mut fast = tee.output();

    let (cancel, handle) = run_tee(tee).await;

    // Drain the fast output concurrently while the slow one overflows
    let collector = tokio::spawn(async move {
        let mut received = Vec::new();
        while let Ok(Some(line)) = tokio::time::timeout(Duration::from_secs(1), fast.recv()).await
        {
            received.push(line);
            if received.len() == total {
                break;
            }
        }
        received
    });

    for i in 0..total {
        tx.send(line(&format!("$X{i}*00"))).await.unwrap();
    }

    let received = collector.await.unwrap();
    cancel.cancel();
    handle.await.unwrap();

    // The slow sibling never stalled the fast one, and its overflow was
    // counted as drops. Order on the fast output matches input order.
    assert!(received.len() >= CHANNEL_CAPACITY);
    assert_eq!(received[0].as_ref(), "$X0*00");
    for pair in received.windows(2) {
        let idx = |l: &Line| l[2..l.len() - 3].parse::<usize>().unwrap();
        assert!(idx(&pair[0]) < idx(&pair[1]));
    }

    let mut page = nmea_metrics::Exposition::new();
    use nmea_metrics::MetricsProvider;
    metrics.collect(&mut page);
    let page = page.into_string();
    let dropped: u64 = page
        .lines()
        .find(|l| l.starts_with("nmea_tee_messages_dropped_total"))
        .and_then(|l| l.rsplit(' ').next())
        .unwrap()
        .parse()
        .unwrap();
    assert!(dropped >= 10, "expected at least 10 drops, saw {dropped}");
}

#[tokio::test]
async fn closed_input_ends_the_service() {
    let (tx, rx) = mpsc::channel(4);
    let mut tee = Tee::new("main", rx);
    drop(tx);

    let cancel = CancellationToken::new();
    tokio::time::timeout(Duration::from_secs(1), tee.serve(cancel))
        .await
        .expect("tee did not stop on closed input")
        .unwrap();
}
