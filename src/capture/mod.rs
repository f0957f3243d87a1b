//! 抓包解析与校验
//!
//! 把设备返回的抓包缓冲区解析成逐包的结构化字段，并按可变字段规则逐包核对。

mod dissect;
mod packet;
mod verify;

pub use dissect::{DissectError, Dissector, PcapDissector};
pub use packet::{DecodedLayer, DecodedPacket};
pub use verify::{CaptureVerifier, Mismatch};
