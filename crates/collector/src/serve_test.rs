use nmea_config::Config;

use super::*;

#[test]
fn default_config_builds_the_full_tree() {
    let config = Config::default();
    let registry = Registry::new();
    let supervisor = build(&config, &registry).unwrap();

    // main tee, tcp-all broadcast, AIS tee + AIS tcp broadcast, instruments,
    // contacts counter, metrics endpoint, raw recorder, "$" tee + gpx
    assert_eq!(supervisor.len(), 10);
}

#[test]
fn everything_disabled_leaves_the_core() {
    let config: Config = r#"
[listen]
tcp_all = ""
tcp_ais = ""

[gpx]
pattern = ""

[raw]
pattern = ""

[metrics]
listen = ""
"#
    .parse()
    .unwrap();
    let registry = Registry::new();
    let supervisor = build(&config, &registry).unwrap();

    // instruments, contacts counter and the main tee always run
    assert_eq!(supervisor.len(), 3);
}

#[test]
fn sources_and_probes_add_children() {
    let config: Config = r#"
[input]
stdin = true
tcp_connect = ["10.0.0.1:2000", "10.0.0.2:2000"]
udp_listen = [2000]
http_listen = [8080]
serial = ["/dev/ttyS0"]

[probe]
serial = ["/dev/ttyS0"]
"#
    .parse()
    .unwrap();
    let registry = Registry::new();
    let supervisor = build(&config, &registry).unwrap();

    // 6 sources + 1 prober on top of the default tree's 10
    assert_eq!(supervisor.len(), 17);
}

#[tokio::test]
async fn built_tree_starts_and_stops() {
    // Everything that binds a port disabled; the remaining services must
    // start and wind down cleanly on cancellation.
    let config: Config = r#"
[listen]
tcp_all = ""
tcp_ais = ""

[gpx]
pattern = ""

[raw]
pattern = ""

[metrics]
listen = ""
"#
    .parse()
    .unwrap();
    let registry = Registry::new();
    let mut supervisor = build(&config, &registry).unwrap();

    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { supervisor.run(cancel).await })
    };

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    cancel.cancel();
    tokio::time::timeout(std::time::Duration::from_secs(5), task)
        .await
        .expect("supervisor did not stop")
        .unwrap()
        .unwrap();
}
