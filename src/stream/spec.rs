//! 流配置构建
//!
//! 增量构建器：先 `add_layer` 再 `bind_field`，最后得到不可变的 `StreamSpec`。

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::layer::{FCS_LEN, LayerTag, Protocol};
use crate::field::{FieldConfigError, FieldMutator};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("packet count must be at least 1")]
    ZeroPackets,
    #[error("no {0:?} layer to anchor the field; add the layer first")]
    Unanchored(LayerTag),
    #[error("field count {count} exceeds stream packet count {packets}")]
    CountExceedsPackets { count: u32, packets: u64 },
    #[error("{width}-byte field at offset {offset} does not fit the {len}-byte {tag:?} layer")]
    FieldOutsideLayer {
        tag: LayerTag,
        offset: usize,
        width: usize,
        len: usize,
    },
    #[error("frame length {frame_len} is too short for {needed} bytes of headers and FCS")]
    FrameTooShort { frame_len: usize, needed: usize },
    #[error(transparent)]
    Field(#[from] FieldConfigError),
}

/// 一个协议层及其上的可变字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub proto: Protocol,
    #[serde(default)]
    pub fields: Vec<FieldMutator>,
}

/// 可变字段与其所在层（按层序号定位）。
#[derive(Debug, Clone, Copy)]
pub struct FieldBinding<'a> {
    pub layer: usize,
    pub tag: LayerTag,
    pub mutator: &'a FieldMutator,
}

/// 把层序号解析为帧内绝对字节偏移。
pub trait LayerOffsets {
    fn layer_start(&self, layer: usize) -> Option<usize>;

    fn absolute_offset(&self, binding: &FieldBinding<'_>) -> Option<usize> {
        self.layer_start(binding.layer)
            .map(|start| start + binding.mutator.offset())
    }
}

/// 不可变的流配置快照。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSpec {
    frame_length: usize,
    packet_count: u64,
    layers: Vec<Layer>,
}

impl StreamSpec {
    pub fn frame_length(&self) -> usize {
        self.frame_length
    }

    pub fn packet_count(&self) -> u64 {
        self.packet_count
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// 实际上线路/被抓到的字节数（不含 FCS）。
    pub fn wire_len(&self) -> usize {
        self.frame_length.saturating_sub(FCS_LEN)
    }

    /// 所有定长头部之和。
    pub fn header_bytes(&self) -> usize {
        self.layers
            .iter()
            .filter_map(|l| l.proto.tag().header_len())
            .sum()
    }

    /// 指定层的长度；载荷层占满头部之后的剩余字节。
    pub fn layer_len(&self, layer: usize) -> Option<usize> {
        let l = self.layers.get(layer)?;
        Some(match l.proto.tag().header_len() {
            Some(n) => n,
            None => self.wire_len().saturating_sub(self.header_bytes()),
        })
    }

    pub fn bindings(&self) -> impl Iterator<Item = FieldBinding<'_>> {
        self.layers.iter().enumerate().flat_map(|(idx, l)| {
            l.fields.iter().map(move |m| FieldBinding {
                layer: idx,
                tag: l.proto.tag(),
                mutator: m,
            })
        })
    }

    /// 完整校验，设备端收到配置后也会再调用一次。
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.packet_count == 0 {
            return Err(StreamError::ZeroPackets);
        }
        let needed = self.header_bytes() + FCS_LEN;
        if self.frame_length < needed {
            return Err(StreamError::FrameTooShort {
                frame_len: self.frame_length,
                needed,
            });
        }
        for b in self.bindings() {
            b.mutator.validate()?;
            check_count(b.mutator, self.packet_count)?;
            let len = self.layer_len(b.layer).unwrap_or(0);
            check_fit(b.tag, b.mutator, len)?;
        }
        Ok(())
    }
}

impl LayerOffsets for StreamSpec {
    fn layer_start(&self, layer: usize) -> Option<usize> {
        if layer >= self.layers.len() {
            return None;
        }
        Some(
            (0..layer)
                .map(|i| self.layer_len(i).unwrap_or(0))
                .sum(),
        )
    }
}

fn check_count(m: &FieldMutator, packets: u64) -> Result<(), StreamError> {
    if u64::from(m.count()) > packets {
        return Err(StreamError::CountExceedsPackets {
            count: m.count(),
            packets,
        });
    }
    Ok(())
}

fn check_fit(tag: LayerTag, m: &FieldMutator, len: usize) -> Result<(), StreamError> {
    let width = m.kind().width();
    if m.offset() + width > len {
        return Err(StreamError::FieldOutsideLayer {
            tag,
            offset: m.offset(),
            width,
            len,
        });
    }
    Ok(())
}

/// `StreamSpec` 的增量构建器。
#[derive(Debug, Clone)]
pub struct StreamBuilder {
    spec: StreamSpec,
}

impl StreamBuilder {
    pub fn new(frame_length: usize, packet_count: u64) -> Self {
        Self {
            spec: StreamSpec {
                frame_length,
                packet_count,
                layers: Vec::new(),
            },
        }
    }

    /// 追加一个使用默认头部取值的协议层。
    pub fn add_layer(&mut self, tag: LayerTag) -> &mut Self {
        self.add_protocol(Protocol::default_for(tag))
    }

    /// 追加一个协议层。层的顺序决定字节偏移，之后不再调整。
    pub fn add_protocol(&mut self, proto: Protocol) -> &mut Self {
        debug!(tag = ?proto.tag(), index = self.spec.layers.len(), "追加协议层");
        self.spec.layers.push(Layer {
            proto,
            fields: Vec::new(),
        });
        self
    }

    /// 在最近一次加入的 `tag` 层上绑定可变字段。
    pub fn bind_field(
        &mut self,
        tag: LayerTag,
        mutator: FieldMutator,
    ) -> Result<&mut Self, StreamError> {
        let packets = self.spec.packet_count;
        let Some(layer) = self
            .spec
            .layers
            .iter_mut()
            .rev()
            .find(|l| l.proto.tag() == tag)
        else {
            return Err(StreamError::Unanchored(tag));
        };
        check_count(&mutator, packets)?;
        if let Some(len) = tag.header_len() {
            check_fit(tag, &mutator, len)?;
        }
        debug!(?tag, offset = mutator.offset(), mask = mutator.mask(), "绑定可变字段");
        layer.fields.push(mutator);
        Ok(self)
    }

    pub fn build(&self) -> Result<StreamSpec, StreamError> {
        self.spec.validate()?;
        Ok(self.spec.clone())
    }
}
