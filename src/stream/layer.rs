//! 协议层
//!
//! 协议层标签、各层头部配置以及固定的字段布局。

use serde::{Deserialize, Serialize};

/// 帧尾 FCS 长度；计入帧长但不会出现在抓包里。
pub const FCS_LEN: usize = 4;

pub const ETHER_TYPE_VLAN: u16 = 0x8100;
pub const ETHER_TYPE_IP4: u16 = 0x0800;
pub const ETHER_TYPE_IP6: u16 = 0x86dd;
pub const IP_PROTO_UDP: u8 = 17;

/// 协议层标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerTag {
    Mac,
    Vlan,
    Eth2,
    Ip4,
    Ip6,
    Udp,
    Payload,
}

/// 层内按名字访问的字段：(名字, 层内偏移, 字节宽度)。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedField {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

const fn nf(name: &'static str, offset: usize, width: usize) -> NamedField {
    NamedField {
        name,
        offset,
        width,
    }
}

const MAC_FIELDS: &[NamedField] = &[nf("mac.dst", 0, 6), nf("mac.src", 6, 6)];
const VLAN_FIELDS: &[NamedField] = &[nf("vlan.tpid", 0, 2), nf("vlan.tci", 2, 2)];
const ETH2_FIELDS: &[NamedField] = &[nf("eth2.type", 0, 2)];
const IP4_FIELDS: &[NamedField] = &[
    nf("ip4.len", 2, 2),
    nf("ip4.id", 4, 2),
    nf("ip4.ttl", 8, 1),
    nf("ip4.proto", 9, 1),
    nf("ip4.checksum", 10, 2),
    nf("ip4.src", 12, 4),
    nf("ip4.dst", 16, 4),
];
const IP6_FIELDS: &[NamedField] = &[
    nf("ip6.plen", 4, 2),
    nf("ip6.next", 6, 1),
    nf("ip6.hlim", 7, 1),
    nf("ip6.src_hi", 8, 8),
    nf("ip6.src_lo", 16, 8),
    nf("ip6.dst_hi", 24, 8),
    nf("ip6.dst_lo", 32, 8),
];
const UDP_FIELDS: &[NamedField] = &[
    nf("udp.srcport", 0, 2),
    nf("udp.dstport", 2, 2),
    nf("udp.length", 4, 2),
    nf("udp.checksum", 6, 2),
];

impl LayerTag {
    /// 头部固定长度；`Payload` 为 None（占满剩余部分）。
    pub fn header_len(self) -> Option<usize> {
        match self {
            LayerTag::Mac => Some(12),
            LayerTag::Vlan => Some(4),
            LayerTag::Eth2 => Some(2),
            LayerTag::Ip4 => Some(20),
            LayerTag::Ip6 => Some(40),
            LayerTag::Udp => Some(8),
            LayerTag::Payload => None,
        }
    }

    pub fn named_fields(self) -> &'static [NamedField] {
        match self {
            LayerTag::Mac => MAC_FIELDS,
            LayerTag::Vlan => VLAN_FIELDS,
            LayerTag::Eth2 => ETH2_FIELDS,
            LayerTag::Ip4 => IP4_FIELDS,
            LayerTag::Ip6 => IP6_FIELDS,
            LayerTag::Udp => UDP_FIELDS,
            LayerTag::Payload => &[],
        }
    }

    /// 紧随 Eth2 时应填入的 EtherType。
    pub fn ether_type(self) -> Option<u16> {
        match self {
            LayerTag::Vlan => Some(ETHER_TYPE_VLAN),
            LayerTag::Ip4 => Some(ETHER_TYPE_IP4),
            LayerTag::Ip6 => Some(ETHER_TYPE_IP6),
            _ => None,
        }
    }
}

/// 协议层及其头部取值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Protocol {
    Mac {
        dst: u64,
        src: u64,
    },
    Vlan {
        tpid: u16,
        vid: u16,
    },
    Eth2 {
        /// None 表示按下一层自动推导
        #[serde(default)]
        ether_type: Option<u16>,
    },
    Ip4 {
        src: u32,
        dst: u32,
        ttl: u8,
    },
    /// 地址拆成高/低 64 位两半
    Ip6 {
        src_hi: u64,
        src_lo: u64,
        dst_hi: u64,
        dst_lo: u64,
        hop_limit: u8,
    },
    Udp {
        src_port: u16,
        dst_port: u16,
    },
    Payload,
}

impl Protocol {
    pub fn tag(&self) -> LayerTag {
        match self {
            Protocol::Mac { .. } => LayerTag::Mac,
            Protocol::Vlan { .. } => LayerTag::Vlan,
            Protocol::Eth2 { .. } => LayerTag::Eth2,
            Protocol::Ip4 { .. } => LayerTag::Ip4,
            Protocol::Ip6 { .. } => LayerTag::Ip6,
            Protocol::Udp { .. } => LayerTag::Udp,
            Protocol::Payload => LayerTag::Payload,
        }
    }

    /// 带默认头部取值的协议层。
    pub fn default_for(tag: LayerTag) -> Self {
        match tag {
            LayerTag::Mac => Protocol::Mac {
                dst: 0x0011_2233_4455,
                src: 0x00aa_bbcc_ddee,
            },
            LayerTag::Vlan => Protocol::Vlan {
                tpid: ETHER_TYPE_VLAN,
                vid: 0,
            },
            LayerTag::Eth2 => Protocol::Eth2 { ether_type: None },
            LayerTag::Ip4 => Protocol::Ip4 {
                src: 0x0102_0304,
                dst: 0x0506_0708,
                ttl: 127,
            },
            LayerTag::Ip6 => Protocol::Ip6 {
                src_hi: 0x2002_0000_0000_0000,
                src_lo: 0x0000_0000_0000_1001,
                dst_hi: 0x4004_0000_0000_0000,
                dst_lo: 0x0000_0000_0000_1001,
                hop_limit: 127,
            },
            LayerTag::Udp => Protocol::Udp {
                src_port: 49152,
                dst_port: 49153,
            },
            LayerTag::Payload => Protocol::Payload,
        }
    }
}
