//! 发生器能力接口
//!
//! 每个调用对应一次远端操作；测试端严格按顺序调用，从不重试。

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::stream::StreamSpec;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PortId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub u32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub id: PortId,
    pub name: String,
    pub description: String,
}

impl PortDescriptor {
    /// 端口名含 `lo`，或描述中含 loopback（不区分大小写）。
    pub fn is_loopback(&self) -> bool {
        self.name.contains("lo") || self.description.to_lowercase().contains("loopback")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStats {
    pub port: PortId,
    pub tx_pkts: u64,
    pub tx_bytes: u64,
    pub rx_pkts: u64,
    pub rx_bytes: u64,
}

/// 跨 RPC 传递的错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    NotConnected,
    UnknownPort,
    UnknownStream,
    DuplicateStream,
    Rejected,
    Other,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteErrorKind::NotConnected => "not connected",
            RemoteErrorKind::UnknownPort => "unknown port",
            RemoteErrorKind::UnknownStream => "unknown stream",
            RemoteErrorKind::DuplicateStream => "duplicate stream",
            RemoteErrorKind::Rejected => "rejected",
            RemoteErrorKind::Other => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("cannot connect to device at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("not connected to device")]
    NotConnected,
    #[error("unknown port {0}")]
    UnknownPort(PortId),
    #[error("unknown stream {stream} on port {port}")]
    UnknownStream { port: PortId, stream: StreamId },
    #[error("stream {stream} already exists on port {port}")]
    DuplicateStream { port: PortId, stream: StreamId },
    #[error("device rejected stream config: {0}")]
    Rejected(String),
    #[error("device error ({kind}): {message}")]
    Remote {
        kind: RemoteErrorKind,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl DeviceError {
    /// 错误发到线上时使用的类别
    pub fn kind(&self) -> RemoteErrorKind {
        match self {
            DeviceError::NotConnected => RemoteErrorKind::NotConnected,
            DeviceError::UnknownPort(_) => RemoteErrorKind::UnknownPort,
            DeviceError::UnknownStream { .. } => RemoteErrorKind::UnknownStream,
            DeviceError::DuplicateStream { .. } => RemoteErrorKind::DuplicateStream,
            DeviceError::Rejected(_) => RemoteErrorKind::Rejected,
            DeviceError::Remote { kind, .. } => *kind,
            _ => RemoteErrorKind::Other,
        }
    }
}

/// 远端发包/抓包设备。
///
/// 对已停止的端口调用 `stop_*` 必须成功。
pub trait GeneratorClient {
    fn connect(&mut self) -> Result<(), DeviceError>;
    fn disconnect(&mut self) -> Result<(), DeviceError>;

    fn list_port_ids(&mut self) -> Result<Vec<PortId>, DeviceError>;
    fn get_port_config(&mut self, ports: &[PortId]) -> Result<Vec<PortDescriptor>, DeviceError>;

    fn add_stream(&mut self, port: PortId, stream: StreamId) -> Result<(), DeviceError>;
    fn delete_stream(&mut self, port: PortId, stream: StreamId) -> Result<(), DeviceError>;
    fn configure_stream(
        &mut self,
        port: PortId,
        stream: StreamId,
        spec: &StreamSpec,
    ) -> Result<(), DeviceError>;

    fn clear_stats(&mut self, ports: &[PortId]) -> Result<(), DeviceError>;
    fn get_stats(&mut self, ports: &[PortId]) -> Result<Vec<PortStats>, DeviceError>;

    fn start_capture(&mut self, ports: &[PortId]) -> Result<(), DeviceError>;
    fn stop_capture(&mut self, ports: &[PortId]) -> Result<(), DeviceError>;
    fn start_transmit(&mut self, ports: &[PortId]) -> Result<(), DeviceError>;
    fn stop_transmit(&mut self, ports: &[PortId]) -> Result<(), DeviceError>;

    /// 上一次抓包窗口的原始数据（legacy pcap）
    fn fetch_capture_buffer(&mut self, port: PortId) -> Result<Vec<u8>, DeviceError>;
}

/// 选出同时用于收发的端口；多个回环端口时取最后一个。
pub fn find_loopback_port(ports: &[PortDescriptor]) -> Option<PortId> {
    ports.iter().rev().find(|p| p.is_loopback()).map(|p| p.id)
}
