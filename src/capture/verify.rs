//! 抓包校验
//!
//! 第 i 个抓到的包（抓包顺序 = 回环端口的发送顺序）必须带有可变字段在 i 处的取值，
//! 且指定的不变字段（校验和）与第一个包逐字节相同。任何一个包不符即整体失败。

use thiserror::Error;
use tracing::{debug, info};

use super::packet::DecodedPacket;
use crate::stream::{FieldBinding, LayerOffsets, StreamSpec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Mismatch {
    #[error("no packets captured")]
    NoPackets,
    #[error("captured {got} packets, expected {expected}")]
    PacketCount { expected: u64, got: usize },
    #[error("field layer {layer} has no offset in the stream layout")]
    Unresolved { layer: usize },
    #[error("packet {pkt}: field at offset {offset} is beyond the captured frame")]
    Truncated { pkt: usize, offset: usize },
    #[error("packet {pkt}: field at offset {offset} is {got}, expected {expected}")]
    Value {
        pkt: usize,
        offset: usize,
        expected: u32,
        got: u32,
    },
    #[error("packet {pkt}: invariant field {name} missing")]
    MissingInvariant { pkt: usize, name: String },
    #[error("packet {pkt}: invariant field {name} is {got:02x?}, first packet had {first:02x?}")]
    Invariant {
        pkt: usize,
        name: String,
        first: Vec<u8>,
        got: Vec<u8>,
    },
}

/// 可变字段 + 不变字段校验器。
#[derive(Debug, Clone)]
pub struct CaptureVerifier {
    invariants: Vec<String>,
}

impl CaptureVerifier {
    /// `invariants` 为按名字访问的字段，例如 `ip4.checksum`。
    pub fn new<I, S>(invariants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            invariants: invariants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn invariants(&self) -> &[String] {
        &self.invariants
    }

    /// 单个可变字段的通过/失败。
    pub fn verify(
        &self,
        packets: &[DecodedPacket],
        binding: &FieldBinding<'_>,
        offsets: &impl LayerOffsets,
    ) -> bool {
        match self.check(packets, binding, offsets) {
            Ok(()) => true,
            Err(m) => {
                info!(mismatch = %m, "❌ 抓包校验失败");
                false
            }
        }
    }

    /// 与 `verify` 相同，但返回第一个不符之处。
    pub fn check(
        &self,
        packets: &[DecodedPacket],
        binding: &FieldBinding<'_>,
        offsets: &impl LayerOffsets,
    ) -> Result<(), Mismatch> {
        if packets.is_empty() {
            return Err(Mismatch::NoPackets);
        }
        let m = binding.mutator;
        let offset = offsets
            .absolute_offset(binding)
            .ok_or(Mismatch::Unresolved {
                layer: binding.layer,
            })?;
        let width = m.kind().width();

        for (i, pkt) in packets.iter().enumerate() {
            let raw = pkt
                .read(offset, width)
                .ok_or(Mismatch::Truncated { pkt: i, offset })?;
            let got = (raw as u32) & m.mask();
            let expected = m.value_at(i as u64);
            if got != expected {
                return Err(Mismatch::Value {
                    pkt: i,
                    offset,
                    expected,
                    got,
                });
            }
        }
        debug!(offset, packets = packets.len(), "可变字段逐包匹配");
        self.check_invariants(packets)
    }

    /// 每个不变字段都必须与第一个包逐字节相同。
    pub fn check_invariants(&self, packets: &[DecodedPacket]) -> Result<(), Mismatch> {
        let Some(first) = packets.first() else {
            return Err(Mismatch::NoPackets);
        };
        for name in &self.invariants {
            let Some(reference) = first.field_bytes(name) else {
                return Err(Mismatch::MissingInvariant {
                    pkt: 0,
                    name: name.clone(),
                });
            };
            for (i, pkt) in packets.iter().enumerate().skip(1) {
                let Some(got) = pkt.field_bytes(name) else {
                    return Err(Mismatch::MissingInvariant {
                        pkt: i,
                        name: name.clone(),
                    });
                };
                if got != reference {
                    return Err(Mismatch::Invariant {
                        pkt: i,
                        name: name.clone(),
                        first: reference.to_vec(),
                        got: got.to_vec(),
                    });
                }
            }
        }
        Ok(())
    }

    /// 校验整条流：包数必须等于流的包数，所有可变字段与不变字段都要通过。
    pub fn check_stream(
        &self,
        packets: &[DecodedPacket],
        spec: &StreamSpec,
    ) -> Result<(), Mismatch> {
        if packets.is_empty() {
            return Err(Mismatch::NoPackets);
        }
        if packets.len() as u64 != spec.packet_count() {
            return Err(Mismatch::PacketCount {
                expected: spec.packet_count(),
                got: packets.len(),
            });
        }
        for b in spec.bindings() {
            self.check(packets, &b, spec)?;
        }
        self.check_invariants(packets)
    }
}
