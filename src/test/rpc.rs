use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use crate::capture::PcapDissector;
use crate::device::{DeviceError, GeneratorClient, PortId, RemoteErrorKind, SimGenerator, StreamId};
use crate::harness::{CASES, HarnessConfig, counter16_ip4_stream, run_suite};
use crate::rpc::{Payload, RemoteError, Reply, Request, RpcClient, dispatch, serve};
use crate::suite::TestSuite;

const TIMEOUT: Duration = Duration::from_secs(5);

/// 起一个只服务一个连接的模拟发生器。
fn spawn_drone() -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    let handle = thread::spawn(move || {
        let mut dev = SimGenerator::new();
        serve(&listener, &mut dev, Some(1)).expect("serve");
    });
    (addr, handle)
}

#[test]
fn suite_passes_over_rpc() {
    let (addr, drone) = spawn_drone();
    let mut client = RpcClient::new(addr, TIMEOUT);
    let mut suite = TestSuite::new();
    let res = run_suite(&mut client, &PcapDissector, &HarnessConfig::sim(), &mut suite);
    assert!(res.is_ok(), "{res:?}");
    assert!(suite.all_passed());
    assert!(!client.is_connected());
    drone.join().expect("drone thread");
}

#[test]
fn remote_errors_keep_their_kind() {
    let (addr, drone) = spawn_drone();
    let mut client = RpcClient::new(addr, TIMEOUT);
    client.connect().expect("connect");

    let lo = PortId(1);
    client.add_stream(lo, StreamId(1)).expect("add");
    assert!(matches!(
        client.add_stream(lo, StreamId(1)),
        Err(DeviceError::Remote {
            kind: RemoteErrorKind::DuplicateStream,
            ..
        })
    ));
    assert!(matches!(
        client.get_stats(&[PortId(9)]),
        Err(DeviceError::Remote {
            kind: RemoteErrorKind::UnknownPort,
            ..
        })
    ));

    let spec = counter16_ip4_stream().expect("stream");
    let mut json = serde_json::to_value(&spec).expect("to json");
    json["frame_length"] = serde_json::json!(32);
    let bad = serde_json::from_value(json).expect("from json");
    let err = client.configure_stream(lo, StreamId(1), &bad).err();
    assert!(
        matches!(&err, Some(DeviceError::Rejected(msg)) if msg.contains("too short")),
        "{err:?}"
    );

    client.configure_stream(lo, StreamId(1), &spec).expect("configure");
    client.start_capture(&[lo]).expect("capture");
    client.start_transmit(&[lo]).expect("transmit");
    client.stop_transmit(&[lo]).expect("stop");
    let stats = client.get_stats(&[lo]).expect("stats");
    assert_eq!(stats[0].rx_pkts, 10);

    client.disconnect().expect("disconnect");
    drone.join().expect("drone thread");
}

#[test]
fn calls_need_a_connection() {
    let mut client = RpcClient::new("127.0.0.1:1", TIMEOUT);
    assert!(matches!(client.list_port_ids(), Err(DeviceError::NotConnected)));
}

#[test]
fn refused_connection_is_a_connect_error() {
    let addr = {
        let l = TcpListener::bind("127.0.0.1:0").expect("bind");
        l.local_addr().expect("addr").to_string()
    };
    let mut client = RpcClient::new(addr.clone(), TIMEOUT);
    let err = client.connect().err();
    assert!(
        matches!(&err, Some(DeviceError::Connect { addr: a, .. }) if *a == addr),
        "{err:?}"
    );
}

#[test]
fn dispatch_reports_not_connected() {
    let mut dev = SimGenerator::new();
    let reply = dispatch(&mut dev, Request::ListPortIds);
    assert!(matches!(
        reply,
        Reply::Err(RemoteError {
            kind: RemoteErrorKind::NotConnected,
            ..
        })
    ));
    dev.connect().expect("connect");
    assert_eq!(
        dispatch(&mut dev, Request::ListPortIds),
        Reply::Ok(Payload::PortIds(vec![PortId(0), PortId(1)]))
    );
}

#[test]
fn wire_format_is_tagged_json() {
    let req = Request::AddStream {
        port: PortId(1),
        stream: StreamId(2),
    };
    assert_eq!(
        serde_json::to_value(&req).expect("json"),
        serde_json::json!({"method": "add_stream", "params": {"port": 1, "stream": 2}})
    );
    let reply = Reply::Err(RemoteError {
        kind: RemoteErrorKind::Rejected,
        message: "bad".into(),
    });
    assert_eq!(
        serde_json::to_value(&reply).expect("json"),
        serde_json::json!({"err": {"kind": "rejected", "message": "bad"}})
    );
    assert_eq!(
        serde_json::to_value(Reply::Ok(Payload::Unit)).expect("json"),
        serde_json::json!({"ok": {"type": "unit"}})
    );
}

#[test]
fn rejected_round_trips_to_rejected() {
    let e = DeviceError::Rejected("frame too short".into());
    let back = DeviceError::from(RemoteError::from(&e));
    assert!(matches!(back, DeviceError::Rejected(m) if m == "frame too short"));
}

#[test]
fn configure_request_round_trips_for_every_case() {
    for case in CASES {
        let spec = (case.stream)().expect("stream");
        let req = Request::ConfigureStream {
            port: PortId(1),
            stream: StreamId(1),
            spec,
        };
        let line = serde_json::to_string(&req).expect("serialize");
        let back: Request = serde_json::from_str(&line)
            .unwrap_or_else(|e| panic!("{}: {e}", case.name));
        assert_eq!(back, req);
    }
}

#[test]
fn ip6_case_is_accepted_by_the_server() {
    let mut dev = SimGenerator::new();
    dev.connect().expect("connect");
    dispatch(
        &mut dev,
        Request::AddStream {
            port: PortId(1),
            stream: StreamId(2),
        },
    );
    let spec = crate::harness::counter32_ip6_stream().expect("stream");
    let line = serde_json::to_string(&Request::ConfigureStream {
        port: PortId(1),
        stream: StreamId(2),
        spec,
    })
    .expect("serialize");
    let req: Request = serde_json::from_str(&line).expect("server-side parse");
    assert_eq!(dispatch(&mut dev, req), Reply::Ok(Payload::Unit));
}
