//! 解析后的包
//!
//! 按绝对偏移或按字段名读取。

use crate::stream::LayerTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedLayer {
    pub tag: LayerTag,
    pub start: usize,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct DecodedPacket {
    pub index: usize,
    pub ts_sec: u32,
    pub ts_usec: u32,
    pub(crate) data: Vec<u8>,
    pub layers: Vec<DecodedLayer>,
}

impl DecodedPacket {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 第一个带该标签的层
    pub fn layer(&self, tag: LayerTag) -> Option<&DecodedLayer> {
        self.layers.iter().find(|l| l.tag == tag)
    }

    /// 绝对偏移 `offset` 处 `width`（<= 8）字节的大端无符号值。
    pub fn read(&self, offset: usize, width: usize) -> Option<u64> {
        if width > 8 {
            return None;
        }
        let bytes = self.data.get(offset..offset.checked_add(width)?)?;
        Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    /// 按名字取字段原始字节，例如 `ip4.checksum`、`udp.checksum`。
    pub fn field_bytes(&self, name: &str) -> Option<&[u8]> {
        self.layers.iter().find_map(|l| {
            let f = l.tag.named_fields().iter().find(|f| f.name == name)?;
            let at = l.start + f.offset;
            self.data.get(at..at + f.width)
        })
    }

    /// 按名字取字段整数值（不超过 8 字节）。
    pub fn field(&self, name: &str) -> Option<u64> {
        let bytes = self.field_bytes(name)?;
        if bytes.len() > 8 {
            return None;
        }
        Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }
}
