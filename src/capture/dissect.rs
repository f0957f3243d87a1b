//! 抓包解析器
//!
//! 读取 legacy pcap，沿 EtherType / IP 协议号逐层解析每一帧，
//! 得到与 `StreamSpec` 布局一致的层偏移。

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::*;
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::packet::{DecodedLayer, DecodedPacket};
use crate::stream::{ETHER_TYPE_IP4, ETHER_TYPE_IP6, ETHER_TYPE_VLAN, IP_PROTO_UDP, LayerTag};

#[derive(Debug, Error)]
pub enum DissectError {
    #[error("not a valid legacy pcap capture: {0}")]
    Format(String),
    #[error("truncated capture after {0} packets")]
    Truncated(usize),
}

/// 把不透明的抓包缓冲区转换成有序的结构化包序列。
pub trait Dissector {
    fn dissect(&self, blob: &[u8]) -> Result<Vec<DecodedPacket>, DissectError>;
}

/// Legacy pcap + Ethernet 解析器。
#[derive(Debug, Clone, Copy, Default)]
pub struct PcapDissector;

impl Dissector for PcapDissector {
    fn dissect(&self, blob: &[u8]) -> Result<Vec<DecodedPacket>, DissectError> {
        let mut reader = LegacyPcapReader::new(65536, blob)
            .map_err(|e| DissectError::Format(format!("{:?}", e)))?;
        let mut out = Vec::new();
        let mut stalled = false;

        loop {
            match reader.next() {
                Ok((offset, block)) => {
                    stalled = false;
                    let frame = match block {
                        PcapBlockOwned::LegacyHeader(ref hdr) => {
                            trace!(network = ?hdr.network, snaplen = hdr.snaplen, "pcap 全局头");
                            None
                        }
                        PcapBlockOwned::Legacy(ref pkt) => {
                            Some((pkt.ts_sec, pkt.ts_usec, pkt.data.to_vec()))
                        }
                        PcapBlockOwned::NG(_) => {
                            warn!("legacy pcap 中出现 pcapng 块，已跳过");
                            None
                        }
                    };
                    drop(block);
                    reader.consume(offset);

                    if let Some((ts_sec, ts_usec, data)) = frame {
                        let layers = dissect_frame(&data);
                        out.push(DecodedPacket {
                            index: out.len(),
                            ts_sec,
                            ts_usec,
                            data,
                            layers,
                        });
                    }
                }
                Err(PcapError::Eof) => break,
                Err(PcapError::Incomplete(_)) => {
                    // 整个缓冲区已在内存里，再次 Incomplete 说明被截断
                    if stalled {
                        return Err(DissectError::Truncated(out.len()));
                    }
                    stalled = true;
                    reader
                        .refill()
                        .map_err(|e| DissectError::Format(format!("{:?}", e)))?;
                }
                // 补读之后仍然解析失败：记录不完整
                Err(_) if stalled => return Err(DissectError::Truncated(out.len())),
                Err(e) => return Err(DissectError::Format(format!("{:?}", e))),
            }
        }

        debug!(packets = out.len(), "抓包解析完成");
        Ok(out)
    }
}

fn layer(tag: LayerTag, start: usize, len: usize) -> DecodedLayer {
    DecodedLayer { tag, start, len }
}

fn be16(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes([*data.get(at)?, *data.get(at + 1)?]))
}

/// 逐层解析一帧；遇到不认识或不完整的头部时，剩余部分记为载荷。
pub(crate) fn dissect_frame(data: &[u8]) -> Vec<DecodedLayer> {
    let mut layers = Vec::new();

    if data.len() < 12 {
        layers.push(layer(LayerTag::Payload, 0, data.len()));
        return layers;
    }
    layers.push(layer(LayerTag::Mac, 0, 12));
    let mut at = 12;

    let mut ether_type = None;
    while let Some(et) = be16(data, at) {
        if et == ETHER_TYPE_VLAN && data.len() >= at + 4 {
            layers.push(layer(LayerTag::Vlan, at, 4));
            at += 4;
            continue;
        }
        layers.push(layer(LayerTag::Eth2, at, 2));
        at += 2;
        ether_type = Some(et);
        break;
    }

    let mut ip_proto = None;
    match ether_type {
        Some(ETHER_TYPE_IP4) if data.len() >= at + 20 => {
            let ihl = usize::from(data[at] & 0x0f) * 4;
            let len = ihl.clamp(20, data.len() - at);
            layers.push(layer(LayerTag::Ip4, at, len));
            ip_proto = Some(data[at + 9]);
            at += len;
        }
        Some(ETHER_TYPE_IP6) if data.len() >= at + 40 => {
            layers.push(layer(LayerTag::Ip6, at, 40));
            ip_proto = Some(data[at + 6]);
            at += 40;
        }
        _ => {}
    }

    if ip_proto == Some(IP_PROTO_UDP) && data.len() >= at + 8 {
        layers.push(layer(LayerTag::Udp, at, 8));
        at += 8;
    }
    if at < data.len() {
        layers.push(layer(LayerTag::Payload, at, data.len() - at));
    }
    layers
}
