//! 发生器设备接口
//!
//! 远端发包/抓包设备的能力接口，以及一个进程内的模拟实现。

mod client;
mod frame;
mod pcap;
mod port;
mod simulated;

pub use client::{
    DeviceError, GeneratorClient, PortDescriptor, PortId, PortStats, RemoteErrorKind, StreamId,
    find_loopback_port,
};
pub use frame::{internet_checksum, render_packet, render_template};
pub use pcap::{LINKTYPE_ETHERNET, PCAP_MAGIC, write_capture};
pub use simulated::SimGenerator;
