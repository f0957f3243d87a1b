use crate::capture::{CaptureVerifier, DecodedPacket, Dissector, Mismatch, PcapDissector};
use crate::device::{GeneratorClient, PortId, SimGenerator, StreamId};
use crate::harness::counter16_ip4_stream;
use crate::stream::{LayerOffsets, StreamSpec};

const LO: PortId = PortId(1);

fn capture(spec: &StreamSpec) -> Vec<DecodedPacket> {
    let mut dev = SimGenerator::new();
    dev.connect().expect("connect");
    dev.add_stream(LO, StreamId(1)).expect("add");
    dev.configure_stream(LO, StreamId(1), spec).expect("configure");
    dev.start_capture(&[LO]).expect("capture");
    dev.start_transmit(&[LO]).expect("transmit");
    dev.stop_transmit(&[LO]).expect("stop");
    dev.stop_capture(&[LO]).expect("stop capture");
    let blob = dev.fetch_capture_buffer(LO).expect("fetch");
    PcapDissector.dissect(&blob).expect("dissect")
}

fn checksum_verifier() -> CaptureVerifier {
    CaptureVerifier::new(["ip4.checksum", "udp.checksum"])
}

#[test]
fn looped_back_stream_passes() {
    let spec = counter16_ip4_stream().expect("stream");
    let packets = capture(&spec);
    assert_eq!(packets.len(), 10);

    let v = checksum_verifier();
    assert_eq!(v.check_stream(&packets, &spec), Ok(()));
    for b in spec.bindings() {
        assert!(v.verify(&packets, &b, &spec));
    }

    let vids: Vec<u64> = packets
        .iter()
        .filter_map(|p| p.read(14, 2))
        .map(|v| v & 0x0fff)
        .collect();
    assert_eq!(vids, vec![101, 100, 99, 98, 97, 96, 95, 95, 95, 95]);
    let dst_lo: Vec<u64> = packets.iter().filter_map(|p| p.read(37, 1)).collect();
    assert_eq!(dst_lo, vec![101, 102, 103, 104, 105, 105, 105, 105, 105, 105]);
}

#[test]
fn wrong_field_value_is_caught() {
    let spec = counter16_ip4_stream().expect("stream");
    let mut packets = capture(&spec);
    packets[6].data[15] = 0;

    let binding = spec.bindings().next().expect("vlan binding");
    let v = checksum_verifier();
    assert!(!v.verify(&packets, &binding, &spec));
    assert_eq!(
        v.check(&packets, &binding, &spec),
        Err(Mismatch::Value {
            pkt: 6,
            offset: 14,
            expected: 95,
            got: 0
        })
    );
}

#[test]
fn changed_checksum_is_caught() {
    let spec = counter16_ip4_stream().expect("stream");
    let mut packets = capture(&spec);
    packets[3].data[29] ^= 0xff;
    let err = checksum_verifier().check_invariants(&packets).err();
    assert!(
        matches!(&err, Some(Mismatch::Invariant { pkt: 3, name, .. }) if name == "ip4.checksum"),
        "{err:?}"
    );
}

#[test]
fn missing_invariant_layer_fails() {
    let spec = counter16_ip4_stream().expect("stream");
    let packets = capture(&spec);
    let err = CaptureVerifier::new(["ip6.plen"]).check_invariants(&packets).err();
    assert!(matches!(err, Some(Mismatch::MissingInvariant { pkt: 0, .. })));
}

#[test]
fn empty_capture_never_passes() {
    let spec = counter16_ip4_stream().expect("stream");
    let binding = spec.bindings().next().expect("binding");
    let v = checksum_verifier();
    assert!(!v.verify(&[], &binding, &spec));
    assert_eq!(v.check_stream(&[], &spec), Err(Mismatch::NoPackets));
}

#[test]
fn short_capture_fails_the_stream() {
    let spec = counter16_ip4_stream().expect("stream");
    let packets = capture(&spec);
    let v = checksum_verifier();
    // 前 7 个包的字段本身都对，但包数不够
    let binding = spec.bindings().next().expect("binding");
    assert!(v.verify(&packets[..7], &binding, &spec));
    assert_eq!(
        v.check_stream(&packets[..7], &spec),
        Err(Mismatch::PacketCount {
            expected: 10,
            got: 7
        })
    );
}

struct NoLayers;

impl LayerOffsets for NoLayers {
    fn layer_start(&self, _layer: usize) -> Option<usize> {
        None
    }
}

#[test]
fn unresolved_layer_fails() {
    let spec = counter16_ip4_stream().expect("stream");
    let packets = capture(&spec);
    let binding = spec.bindings().next().expect("binding");
    assert_eq!(
        checksum_verifier().check(&packets, &binding, &NoLayers),
        Err(Mismatch::Unresolved { layer: 1 })
    );
}
