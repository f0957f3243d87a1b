//! 帧模板
//!
//! 按协议层顺序渲染帧模板并填好校验和，再逐包套用可变字段。
//! 校验和只在模板上计算一次，可变字段不会改动它们。

use tracing::trace;

use crate::stream::{IP_PROTO_UDP, LayerOffsets, LayerTag, Protocol, StreamSpec};

/// IPv6 "无下一头部"
const IP6_NO_NEXT: u8 = 59;
const IP4_NO_PROTO: u8 = 0xff;

fn put_be(buf: &mut [u8], at: usize, value: u128, width: usize) {
    for i in 0..width {
        let shift = 8 * (width - 1 - i);
        buf[at + i] = (value >> shift) as u8;
    }
}

/// RFC 1071 反码和，返回已取反的 16 位校验和。
pub fn internet_checksum(chunks: &[&[u8]]) -> u16 {
    let mut sum: u32 = 0;
    for chunk in chunks {
        let mut it = chunk.chunks_exact(2);
        for w in &mut it {
            sum += u32::from(u16::from_be_bytes([w[0], w[1]]));
        }
        if let [last] = it.remainder() {
            sum += u32::from(*last) << 8;
        }
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// 渲染帧模板（不含 FCS），头部字段与校验和均已填好。
pub fn render_template(spec: &StreamSpec) -> Vec<u8> {
    let wire_len = spec.wire_len();
    let mut buf = vec![0u8; wire_len];
    let layers = spec.layers();
    let starts: Vec<usize> = (0..layers.len())
        .map(|i| spec.layer_start(i).unwrap_or(0))
        .collect();
    let next_tag = |i: usize| layers.get(i + 1).map(|l| l.proto.tag());

    for (i, layer) in layers.iter().enumerate() {
        let at = starts[i];
        match &layer.proto {
            Protocol::Mac { dst, src } => {
                put_be(&mut buf, at, u128::from(*dst), 6);
                put_be(&mut buf, at + 6, u128::from(*src), 6);
            }
            Protocol::Vlan { tpid, vid } => {
                put_be(&mut buf, at, u128::from(*tpid), 2);
                put_be(&mut buf, at + 2, u128::from(*vid & 0x0fff), 2);
            }
            Protocol::Eth2 { ether_type } => {
                let et = ether_type
                    .or_else(|| next_tag(i).and_then(LayerTag::ether_type))
                    .unwrap_or(0);
                put_be(&mut buf, at, u128::from(et), 2);
            }
            Protocol::Ip4 { src, dst, ttl } => {
                let total = wire_len - at;
                let proto = match next_tag(i) {
                    Some(LayerTag::Udp) => IP_PROTO_UDP,
                    _ => IP4_NO_PROTO,
                };
                buf[at] = 0x45;
                put_be(&mut buf, at + 2, total.min(0xffff) as u128, 2);
                buf[at + 8] = *ttl;
                buf[at + 9] = proto;
                put_be(&mut buf, at + 12, u128::from(*src), 4);
                put_be(&mut buf, at + 16, u128::from(*dst), 4);
            }
            Protocol::Ip6 {
                src_hi,
                src_lo,
                dst_hi,
                dst_lo,
                hop_limit,
            } => {
                let plen = wire_len - at - 40;
                let next = match next_tag(i) {
                    Some(LayerTag::Udp) => IP_PROTO_UDP,
                    _ => IP6_NO_NEXT,
                };
                put_be(&mut buf, at, 0x6000_0000, 4);
                put_be(&mut buf, at + 4, plen.min(0xffff) as u128, 2);
                buf[at + 6] = next;
                buf[at + 7] = *hop_limit;
                put_be(&mut buf, at + 8, u128::from(*src_hi), 8);
                put_be(&mut buf, at + 16, u128::from(*src_lo), 8);
                put_be(&mut buf, at + 24, u128::from(*dst_hi), 8);
                put_be(&mut buf, at + 32, u128::from(*dst_lo), 8);
            }
            Protocol::Udp { src_port, dst_port } => {
                let len = wire_len - at;
                put_be(&mut buf, at, u128::from(*src_port), 2);
                put_be(&mut buf, at + 2, u128::from(*dst_port), 2);
                put_be(&mut buf, at + 4, len.min(0xffff) as u128, 2);
            }
            Protocol::Payload => {
                for (k, b) in buf[at..].iter_mut().enumerate() {
                    *b = k as u8;
                }
            }
        }
    }

    // 校验和：先 IPv4 头，再 UDP（伪头部取前一个 IP 层）
    for (i, layer) in layers.iter().enumerate() {
        if layer.proto.tag() == LayerTag::Ip4 {
            let at = starts[i];
            let sum = internet_checksum(&[&buf[at..at + 20]]);
            put_be(&mut buf, at + 10, u128::from(sum), 2);
        }
    }
    for (i, layer) in layers.iter().enumerate() {
        if layer.proto.tag() != LayerTag::Udp {
            continue;
        }
        let at = starts[i];
        let udp_len = (wire_len - at) as u32;
        let ip = layers[..i]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, l)| matches!(l.proto.tag(), LayerTag::Ip4 | LayerTag::Ip6));
        let pseudo: Vec<u8> = match ip {
            Some((j, l)) if l.proto.tag() == LayerTag::Ip4 => {
                let ip_at = starts[j];
                let mut p = buf[ip_at + 12..ip_at + 20].to_vec();
                p.extend_from_slice(&[0, IP_PROTO_UDP]);
                p.extend_from_slice(&(udp_len as u16).to_be_bytes());
                p
            }
            Some((j, _)) => {
                let ip_at = starts[j];
                let mut p = buf[ip_at + 8..ip_at + 40].to_vec();
                p.extend_from_slice(&udp_len.to_be_bytes());
                p.extend_from_slice(&[0, 0, 0, IP_PROTO_UDP]);
                p
            }
            None => Vec::new(),
        };
        let mut sum = internet_checksum(&[&pseudo, &buf[at..]]);
        if sum == 0 {
            sum = 0xffff;
        }
        put_be(&mut buf, at + 6, u128::from(sum), 2);
    }

    trace!(len = buf.len(), "渲染帧模板");
    buf
}

/// 第 `pkt_idx` 个包：模板 + 所有可变字段在该包的取值。
pub fn render_packet(spec: &StreamSpec, template: &[u8], pkt_idx: u64) -> Vec<u8> {
    let mut pkt = template.to_vec();
    for b in spec.bindings() {
        if let Some(at) = spec.absolute_offset(&b) {
            b.mutator.apply(&mut pkt, at, pkt_idx);
        }
    }
    pkt
}
