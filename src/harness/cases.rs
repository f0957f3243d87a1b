//! 用例定义
//!
//! 每个用例给出一条带可变字段的流，以及必须保持不变的校验和字段。

use crate::field::{FieldMutator, FieldType, Mode};
use crate::stream::{LayerTag, StreamBuilder, StreamError, StreamSpec};

pub const COUNTER16_CASE: &str = "counter16NotAffectingCksums";
pub const COUNTER32_IP6_CASE: &str = "counter32Ip6NotAffectingCksums";

pub struct CaseDef {
    pub name: &'static str,
    pub stream: fn() -> Result<StreamSpec, StreamError>,
    /// 所有抓到的包上都必须与第一个包相同的字段
    pub invariants: &'static [&'static str],
}

pub const CASES: &[CaseDef] = &[
    CaseDef {
        name: COUNTER16_CASE,
        stream: counter16_ip4_stream,
        invariants: &["ip4.checksum", "udp.checksum"],
    },
    CaseDef {
        name: COUNTER32_IP6_CASE,
        stream: counter32_ip6_stream,
        invariants: &["udp.checksum"],
    },
];

/// mac:vlan:eth2:ip4:udp:payload，10 个 128 字节的帧。
///
/// - VLAN ID（vlan 层偏移 2，掩码 0x0fff）从 101 递减 7 个包
/// - 目的 IP 最低字节（ip4 层偏移 16，掩码 0xff）从 101 递增 5 个包
pub fn counter16_ip4_stream() -> Result<StreamSpec, StreamError> {
    let mut b = StreamBuilder::new(128, 10);
    b.add_layer(LayerTag::Mac).add_layer(LayerTag::Vlan);
    b.bind_field(
        LayerTag::Vlan,
        FieldMutator::new(FieldType::Counter16, 2, 0x0fff, 101, Mode::Decrement, 7)?,
    )?;
    b.add_layer(LayerTag::Eth2).add_layer(LayerTag::Ip4);
    b.bind_field(
        LayerTag::Ip4,
        FieldMutator::new(FieldType::Counter32, 16, 0x0000_00ff, 101, Mode::Increment, 5)?,
    )?;
    b.add_layer(LayerTag::Udp).add_layer(LayerTag::Payload);
    b.build()
}

/// 同样的 VLAN 计数器，IP 层换成 IPv6，递增的是源地址的最低字节（ip6 层偏移 20）。
pub fn counter32_ip6_stream() -> Result<StreamSpec, StreamError> {
    let mut b = StreamBuilder::new(128, 10);
    b.add_layer(LayerTag::Mac).add_layer(LayerTag::Vlan);
    b.bind_field(
        LayerTag::Vlan,
        FieldMutator::new(FieldType::Counter16, 2, 0x0fff, 101, Mode::Decrement, 7)?,
    )?;
    b.add_layer(LayerTag::Eth2).add_layer(LayerTag::Ip6);
    b.bind_field(
        LayerTag::Ip6,
        FieldMutator::new(FieldType::Counter32, 20, 0x0000_00ff, 101, Mode::Increment, 5)?,
    )?;
    b.add_layer(LayerTag::Udp).add_layer(LayerTag::Payload);
    b.build()
}
