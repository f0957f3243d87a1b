use crate::capture::{Dissector, PcapDissector};
use crate::device::{
    DeviceError, GeneratorClient, PortId, SimGenerator, StreamId, find_loopback_port,
};
use crate::harness::counter16_ip4_stream;
use crate::sim::SimTime;

const ETH0: PortId = PortId(0);
const LO: PortId = PortId(1);
const S1: StreamId = StreamId(1);

fn connected() -> SimGenerator {
    let mut dev = SimGenerator::new();
    dev.connect().expect("connect");
    dev
}

fn with_stream(port: PortId) -> SimGenerator {
    let mut dev = connected();
    let spec = counter16_ip4_stream().expect("stream");
    dev.add_stream(port, S1).expect("add");
    dev.configure_stream(port, S1, &spec).expect("configure");
    dev
}

#[test]
fn calls_before_connect_fail() {
    let mut dev = SimGenerator::new();
    assert!(matches!(dev.list_port_ids(), Err(DeviceError::NotConnected)));
    assert!(matches!(dev.start_transmit(&[LO]), Err(DeviceError::NotConnected)));
    dev.connect().expect("connect");
    assert!(dev.is_connected());
    dev.disconnect().expect("disconnect");
    assert!(matches!(
        dev.fetch_capture_buffer(LO),
        Err(DeviceError::NotConnected)
    ));
}

#[test]
fn default_ports_include_one_loopback() {
    let mut dev = connected();
    let ids = dev.list_port_ids().expect("ids");
    assert_eq!(ids, vec![ETH0, LO]);
    let ports = dev.get_port_config(&ids).expect("config");
    assert_eq!(ports[1].name, "lo");
    assert!(!ports[0].is_loopback());
    assert_eq!(find_loopback_port(&ports), Some(LO));
}

#[test]
fn last_loopback_port_is_chosen() {
    let mut dev = SimGenerator::new();
    let lo2 = dev.add_port("eth9", "Secondary LOOPBACK", true);
    dev.connect().expect("connect");
    let ids = dev.list_port_ids().expect("ids");
    let ports = dev.get_port_config(&ids).expect("config");
    assert_eq!(find_loopback_port(&ports), Some(lo2));
}

#[test]
fn no_ports_means_no_loopback() {
    let mut dev = SimGenerator::without_ports();
    dev.connect().expect("connect");
    assert!(dev.list_port_ids().expect("ids").is_empty());
    assert_eq!(find_loopback_port(&[]), None);
}

#[test]
fn unknown_port_and_stream_are_errors() {
    let mut dev = connected();
    assert!(matches!(
        dev.add_stream(PortId(7), S1),
        Err(DeviceError::UnknownPort(PortId(7)))
    ));
    assert!(matches!(
        dev.clear_stats(&[LO, PortId(7)]),
        Err(DeviceError::UnknownPort(PortId(7)))
    ));
    assert!(matches!(
        dev.delete_stream(LO, S1),
        Err(DeviceError::UnknownStream { .. })
    ));
    let spec = counter16_ip4_stream().expect("stream");
    assert!(matches!(
        dev.configure_stream(LO, S1, &spec),
        Err(DeviceError::UnknownStream { .. })
    ));
}

#[test]
fn duplicate_stream_is_rejected() {
    let mut dev = connected();
    dev.add_stream(LO, S1).expect("add");
    assert!(matches!(
        dev.add_stream(LO, S1),
        Err(DeviceError::DuplicateStream { .. })
    ));
    dev.delete_stream(LO, S1).expect("delete");
    dev.add_stream(LO, S1).expect("add again");
}

#[test]
fn invalid_config_is_rejected() {
    let mut dev = connected();
    dev.add_stream(LO, S1).expect("add");
    let spec = counter16_ip4_stream().expect("stream");
    let mut json = serde_json::to_value(&spec).expect("to json");
    json["packet_count"] = serde_json::json!(3);
    let bad = serde_json::from_value(json).expect("from json");
    let err = dev.configure_stream(LO, S1, &bad).err();
    assert!(
        matches!(&err, Some(DeviceError::Rejected(msg)) if msg.contains("exceeds")),
        "{err:?}"
    );
}

#[test]
fn loopback_port_counts_and_captures() {
    let mut dev = with_stream(LO);
    dev.clear_stats(&[LO]).expect("clear");
    dev.start_capture(&[LO]).expect("capture");
    dev.start_transmit(&[LO]).expect("transmit");
    assert!(!dev.is_transmitting(LO));
    assert!(dev.now() > SimTime::ZERO);

    let stats = dev.get_stats(&[LO]).expect("stats");
    assert_eq!(stats[0].tx_pkts, 10);
    assert_eq!(stats[0].rx_pkts, 10);
    assert_eq!(stats[0].tx_bytes, 10 * 124);

    let blob = dev.fetch_capture_buffer(LO).expect("fetch");
    assert_eq!(PcapDissector.dissect(&blob).expect("dissect").len(), 10);
}

#[test]
fn frames_are_spaced_by_line_rate() {
    let mut dev = SimGenerator::new().with_line_rate(1_000_000);
    dev.connect().expect("connect");
    let spec = counter16_ip4_stream().expect("stream");
    dev.add_stream(LO, S1).expect("add");
    dev.configure_stream(LO, S1, &spec).expect("configure");
    dev.start_capture(&[LO]).expect("capture");
    dev.start_transmit(&[LO]).expect("transmit");
    let blob = dev.fetch_capture_buffer(LO).expect("fetch");
    let packets = PcapDissector.dissect(&blob).expect("dissect");
    // (124 + 4 + 20) bytes at 1 Mbps = 1184 us per frame
    let ts: Vec<(u32, u32)> = packets.iter().map(|p| (p.ts_sec, p.ts_usec)).collect();
    assert_eq!(ts[0], (0, 1_184));
    assert_eq!(ts[1], (0, 2_368));
}

#[test]
fn nothing_is_captured_outside_the_window() {
    let mut dev = with_stream(LO);
    dev.start_transmit(&[LO]).expect("transmit");
    let blob = dev.fetch_capture_buffer(LO).expect("fetch");
    assert!(PcapDissector.dissect(&blob).expect("dissect").is_empty());

    dev.start_capture(&[LO]).expect("capture");
    dev.stop_capture(&[LO]).expect("stop capture");
    dev.start_transmit(&[LO]).expect("transmit");
    let blob = dev.fetch_capture_buffer(LO).expect("fetch");
    assert!(PcapDissector.dissect(&blob).expect("dissect").is_empty());
}

#[test]
fn plain_port_sends_but_receives_nothing() {
    let mut dev = with_stream(ETH0);
    dev.start_capture(&[ETH0]).expect("capture");
    dev.start_transmit(&[ETH0]).expect("transmit");
    let stats = dev.get_stats(&[ETH0]).expect("stats");
    assert_eq!(stats[0].tx_pkts, 10);
    assert_eq!(stats[0].rx_pkts, 0);
}

#[test]
fn unconfigured_stream_sends_nothing() {
    let mut dev = connected();
    dev.add_stream(LO, S1).expect("add");
    dev.start_transmit(&[LO]).expect("transmit");
    assert_eq!(dev.get_stats(&[LO]).expect("stats")[0].tx_pkts, 0);
}

#[test]
fn stop_transmit_is_idempotent() {
    let mut dev = with_stream(LO);
    dev.stop_transmit(&[LO]).expect("stop while idle");
    dev.start_transmit(&[LO]).expect("transmit");
    dev.stop_transmit(&[LO]).expect("stop");
    dev.stop_transmit(&[LO]).expect("stop again");
    dev.stop_capture(&[LO]).expect("stop capture while idle");
}
