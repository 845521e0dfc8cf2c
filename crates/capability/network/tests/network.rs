use domain::{Message, PresentationType, SetReqType};
use mysgw_network::{Network, NetworkError, SnapshotError, Variable};
use mysgw_protocol::{
    GatedSender, NodeIdSource, ProtocolHandler, ReadinessGate, ReadyTrigger, decode,
};
use mysgw_telemetry::{LinkMetrics, MetricsPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

fn network(ready: bool) -> (Network, mpsc::Receiver<Message>) {
    let (tx, rx) = mpsc::channel(16);
    let gate = ReadinessGate::new();
    if ready {
        gate.mark_ready(ReadyTrigger::GatewayReady);
    }
    let replies = GatedSender::new(tx, gate, LinkMetrics::detached().expect("metrics"));
    let metrics = MetricsPolicy::detached().expect("policy");
    (Network::new(metrics, replies), rx)
}

async fn feed(network: &mut Network, line: &[u8]) -> Result<(), NetworkError> {
    network.handle_message(&decode(line).expect("decode")).await
}

#[tokio::test]
async fn set_creates_node_sensor_and_gauge() {
    let (mut network, _rx) = network(true);
    feed(&mut network, b"4;1;1;0;0;21.5\n").await.expect("set");

    let sensor = network.node(4).and_then(|node| node.sensor(1)).expect("sensor");
    assert_eq!(
        sensor.variable("V_TEMP"),
        Some(&Variable::Float {
            sub_type: SetReqType::Temp,
            value: 21.5
        })
    );
    assert_eq!(
        network
            .metrics()
            .gauge_value(SetReqType::Temp, ["", "4", "1"]),
        Some(21.5)
    );
    assert_eq!(network.metrics().packet_count("4", ""), 1);
}

#[tokio::test]
async fn non_numeric_payload_keeps_previous_value() {
    let (mut network, _rx) = network(true);
    feed(&mut network, b"4;1;1;0;0;21.5\n").await.expect("set");

    let err = feed(&mut network, b"4;1;1;0;0;warm\n")
        .await
        .expect_err("rejected");
    assert!(matches!(err, NetworkError::InvalidFloat { .. }));

    let sensor = network.node(4).and_then(|node| node.sensor(1)).expect("sensor");
    assert_eq!(
        sensor.variable("V_TEMP").and_then(Variable::as_float),
        Some(21.5)
    );
}

#[tokio::test]
async fn first_non_numeric_payload_creates_nothing() {
    let (mut network, _rx) = network(true);
    assert!(feed(&mut network, b"4;1;1;0;1;n/a\n").await.is_err());
    let sensor = network.node(4).and_then(|node| node.sensor(1)).expect("sensor");
    assert!(sensor.variable("V_HUM").is_none());
}

#[tokio::test]
async fn req_replies_with_value_or_zero() {
    let (mut network, mut rx) = network(true);
    feed(&mut network, b"4;1;2;0;0;\n").await.expect("req");
    let reply = rx.recv().await.expect("reply");
    assert_eq!(reply.payload, b"0".to_vec());
    assert_eq!(reply.message_type, domain::MessageType::Req);

    feed(&mut network, b"4;1;1;0;0;21.5\n").await.expect("set");
    feed(&mut network, b"4;1;2;1;0;\n").await.expect("req");
    let reply = rx.recv().await.expect("reply");
    assert_eq!(reply.payload, b"21.50".to_vec());
    assert_eq!(reply.ack, domain::AckType::Ack);
    assert_eq!((reply.node_id, reply.child_sensor_id), (4, 1));
}

#[tokio::test]
async fn req_reply_is_gated() {
    let (mut network, mut rx) = network(false);
    feed(&mut network, b"4;1;2;0;2;\n").await.expect("req");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn node_level_messages() {
    let (mut network, _rx) = network(true);
    feed(&mut network, b"7;255;3;0;0;87\n").await.expect("battery");
    feed(&mut network, b"7;255;3;0;11;Weather\n").await.expect("sketch");
    feed(&mut network, b"7;255;3;0;12;1.2\n").await.expect("version");
    feed(&mut network, b"7;255;3;0;2;2.3.2\n").await.expect("lib version");

    let node = network.node(7).expect("node");
    assert_eq!(node.battery, 87);
    assert_eq!(node.sketch_name, "Weather");
    assert_eq!(node.sketch_version, "1.2");
    assert_eq!(node.version, "2.3.2");
    assert_eq!(
        network
            .metrics()
            .gauge_value(SetReqType::Percentage, ["", "7", "0"]),
        Some(0.87)
    );

    let err = feed(&mut network, b"7;255;1;0;0;1\n").await.expect_err("not internal");
    assert!(matches!(err, NetworkError::NodeLevelNotInternal { node_id: 7, .. }));
    assert!(feed(&mut network, b"7;255;3;0;0;120\n").await.is_err());
    assert_eq!(network.node(7).expect("node").battery, 87);
}

#[tokio::test]
async fn next_node_id_tracks_known_nodes() {
    let (mut network, _rx) = network(true);
    let ids = network.id_source();
    assert_eq!(network.next_node_id(), Some(1));
    assert_eq!(ids.next_node_id(), Some(1));

    feed(&mut network, b"1;255;3;0;11;A\n").await.expect("node 1");
    feed(&mut network, b"5;255;3;0;11;B\n").await.expect("node 5");
    assert_eq!(network.next_node_id(), Some(6));
    assert_eq!(ids.next_node_id(), Some(6));

    feed(&mut network, b"0;0;1;0;2;1\n").await.expect("gateway sensor");
    assert_eq!(ids.next_node_id(), Some(6));
}

#[tokio::test]
async fn id_request_skips_nodes_still_queued_for_the_network() {
    let (network, _rx) = network(true);
    let gate = ReadinessGate::new();
    let (tx_link, mut outbound) = mpsc::channel(16);
    let replies = GatedSender::new(tx_link, gate, LinkMetrics::detached().expect("metrics"));
    let handler = ProtocolHandler::new(Arc::new(network.id_source()), replies);

    let (inbound, rx) = mpsc::channel(16);
    let (network_tx, mut queued) = mpsc::channel(16);
    let lines: [&[u8]; 3] = [
        b"0;255;3;0;14;Gateway startup complete.\n",
        b"7;1;1;0;0;20.0\n",
        b"0;255;3;0;3;\n",
    ];
    for line in lines {
        inbound.send(decode(line).expect("decode")).await.expect("queue");
    }
    drop(inbound);
    handler.run(rx, network_tx).await.expect("handler");

    let reply = outbound.recv().await.expect("id response");
    assert_eq!(reply.payload, b"8".to_vec());
    assert_eq!(queued.recv().await.map(|message| message.node_id), Some(0));
    assert_eq!(queued.recv().await.map(|message| message.node_id), Some(7));
    assert_eq!(network.nodes().count(), 0);
}

#[tokio::test]
async fn locations_apply_to_existing_and_new_nodes() {
    let (mut network, _rx) = network(true);
    feed(&mut network, b"4;1;1;0;0;21.5\n").await.expect("set");
    network.set_locations(HashMap::from([
        ("4".to_string(), "attic".to_string()),
        ("9".to_string(), "garage".to_string()),
    ]));
    feed(&mut network, b"9;1;1;0;1;40\n").await.expect("set");

    assert_eq!(network.node(4).expect("node").location, "attic");
    assert_eq!(network.node(9).expect("node").location, "garage");
    assert_eq!(
        network
            .metrics()
            .gauge_value(SetReqType::Hum, ["garage", "9", "1"]),
        Some(40.0)
    );
}

#[tokio::test]
async fn snapshot_round_trip_restores_topology() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.json");

    let (mut network, _rx) = network(true);
    feed(&mut network, b"4;1;0;0;6;\n").await.expect("presentation");
    feed(&mut network, b"4;1;1;0;0;21.5\n").await.expect("set");
    feed(&mut network, b"4;255;3;0;0;55\n").await.expect("battery");
    feed(&mut network, b"4;255;3;0;11;Attic\n").await.expect("sketch");
    feed(&mut network, b"9;2;0;0;7;\n").await.expect("presentation");
    feed(&mut network, b"9;2;1;0;1;40\n").await.expect("set");
    network.save(&path).expect("save");

    let (tx, _rx2) = mpsc::channel(1);
    let replies = GatedSender::new(tx, ReadinessGate::new(), LinkMetrics::detached().expect("metrics"));
    let restored = Network::load(&path, MetricsPolicy::detached().expect("policy"), replies)
        .expect("load");
    assert_eq!(restored.nodes().count(), 2);

    let node = restored.node(4).expect("node");
    assert_eq!(node.battery, 55);
    assert_eq!(node.sketch_name, "Attic");
    let sensor = node.sensor(1).expect("sensor");
    assert_eq!(sensor.presentation, Some(PresentationType::Temp));
    assert_eq!(sensor.node_id(), Some(4));
    assert!(sensor.variable("V_TEMP").is_none());

    let sensor = restored
        .node(9)
        .and_then(|node| node.sensor(2))
        .expect("sensor");
    assert_eq!(sensor.presentation, Some(PresentationType::Hum));
    assert_eq!(sensor.node_id(), Some(9));
    assert!(sensor.variable("V_HUM").is_none());

    assert_eq!(restored.id_source().next_node_id(), Some(10));
}

#[tokio::test]
async fn wrong_shaped_snapshot_is_malformed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (tx, _rx) = mpsc::channel(1);
    let replies = GatedSender::new(tx, ReadinessGate::new(), LinkMetrics::detached().expect("metrics"));

    let documents: [&[u8]; 5] = [
        br#"{"Nodes":{"4":{"id":4,"sensors":{}}}}"#,
        b"{}",
        b"[]",
        br#"{"nodes":{},"foo":1}"#,
        br#"{"nodes":{"4":{"id":4,"Battery":50}}}"#,
    ];
    for (index, document) in documents.into_iter().enumerate() {
        let path = dir.path().join(format!("state-{index}.json"));
        std::fs::write(&path, document).expect("write");
        let err = Network::load(&path, MetricsPolicy::detached().expect("policy"), replies.clone())
            .err()
            .expect("rejected");
        assert!(matches!(err, SnapshotError::Malformed { .. }));
    }
}

#[tokio::test]
async fn missing_snapshot_is_empty_and_malformed_is_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (tx, _rx) = mpsc::channel(1);
    let replies = GatedSender::new(tx, ReadinessGate::new(), LinkMetrics::detached().expect("metrics"));

    let empty = Network::load(
        &dir.path().join("absent"),
        MetricsPolicy::detached().expect("policy"),
        replies.clone(),
    )
    .expect("missing is fine");
    assert_eq!(empty.nodes().count(), 0);

    let broken = dir.path().join("broken");
    std::fs::write(&broken, b"{ not json").expect("write");
    let err = Network::load(&broken, MetricsPolicy::detached().expect("policy"), replies)
        .err()
        .expect("malformed");
    assert!(matches!(err, SnapshotError::Malformed { .. }));
}

#[tokio::test]
async fn status_report_is_sorted() {
    let (mut network, _rx) = network(true);
    feed(&mut network, b"12;2;1;0;2;1\n").await.expect("set");
    feed(&mut network, b"3;1;1;0;0;19\n").await.expect("set");
    feed(&mut network, b"3;0;0;0;6;\n").await.expect("presentation");

    let report = network.status_report();
    let node3 = report.find("Node 3 ").expect("node 3");
    let node12 = report.find("Node 12 ").expect("node 12");
    assert!(node3 < node12);
    assert!(report.contains(" Sensor 0 [S_TEMP]:"));
    assert!(report.contains("V_TEMP: 19.00"));
    assert!(report.find(" Sensor 0 ").expect("s0") < report.find(" Sensor 1 ").expect("s1"));
}
