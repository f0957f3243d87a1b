//! 线上消息格式

use serde::{Deserialize, Serialize};

use crate::device::{DeviceError, PortDescriptor, PortId, PortStats, RemoteErrorKind, StreamId};
use crate::stream::StreamSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum Request {
    ListPortIds,
    GetPortConfig { ports: Vec<PortId> },
    AddStream { port: PortId, stream: StreamId },
    DeleteStream { port: PortId, stream: StreamId },
    ConfigureStream {
        port: PortId,
        stream: StreamId,
        spec: StreamSpec,
    },
    ClearStats { ports: Vec<PortId> },
    GetStats { ports: Vec<PortId> },
    StartCapture { ports: Vec<PortId> },
    StopCapture { ports: Vec<PortId> },
    StartTransmit { ports: Vec<PortId> },
    StopTransmit { ports: Vec<PortId> },
    FetchCaptureBuffer { port: PortId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Unit,
    PortIds(Vec<PortId>),
    PortConfig(Vec<PortDescriptor>),
    Stats(Vec<PortStats>),
    Capture(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reply {
    Ok(Payload),
    Err(RemoteError),
}

impl From<&DeviceError> for RemoteError {
    fn from(e: &DeviceError) -> Self {
        let message = match e {
            DeviceError::Rejected(msg) => msg.clone(),
            DeviceError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        };
        RemoteError {
            kind: e.kind(),
            message,
        }
    }
}

impl From<RemoteError> for DeviceError {
    fn from(e: RemoteError) -> Self {
        match e.kind {
            RemoteErrorKind::Rejected => DeviceError::Rejected(e.message),
            RemoteErrorKind::NotConnected => DeviceError::NotConnected,
            kind => DeviceError::Remote {
                kind,
                message: e.message,
            },
        }
    }
}
