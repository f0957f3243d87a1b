//! 计数器字段
//!
//! 给定基值、掩码、步数与方向，计算每个发送包在固定偏移处写入的值。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 计数器宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Counter16,
    Counter32,
}

impl FieldType {
    /// 字段占用的字节数
    pub fn width(self) -> usize {
        match self {
            FieldType::Counter16 => 2,
            FieldType::Counter32 => 4,
        }
    }

    /// 该宽度下可选的全部比特
    pub fn full_mask(self) -> u32 {
        match self {
            FieldType::Counter16 => 0xffff,
            FieldType::Counter32 => 0xffff_ffff,
        }
    }
}

/// 计数方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldConfigError {
    #[error("count must be at least 1")]
    ZeroCount,
    #[error("mask must select at least one bit")]
    ZeroMask,
    #[error("mask {mask:#x} does not fit a {width}-byte field")]
    MaskTooWide { mask: u32, width: usize },
    #[error("base value {value:#x} has bits outside mask {mask:#x}")]
    ValueOutsideMask { value: u32, mask: u32 },
}

/// 计数器型可变字段。
///
/// `offset` 相对于所属协议层的起始位置；构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMutator {
    kind: FieldType,
    offset: usize,
    mask: u32,
    value: u32,
    mode: Mode,
    count: u32,
}

impl FieldMutator {
    /// 创建并校验一个可变字段。
    pub fn new(
        kind: FieldType,
        offset: usize,
        mask: u32,
        value: u32,
        mode: Mode,
        count: u32,
    ) -> Result<Self, FieldConfigError> {
        let m = Self {
            kind,
            offset,
            mask,
            value,
            mode,
            count,
        };
        m.validate()?;
        Ok(m)
    }

    /// 重新校验（反序列化得到的实例也需要走一遍）。
    pub fn validate(&self) -> Result<(), FieldConfigError> {
        if self.count == 0 {
            return Err(FieldConfigError::ZeroCount);
        }
        if self.mask == 0 {
            return Err(FieldConfigError::ZeroMask);
        }
        if self.mask & !self.kind.full_mask() != 0 {
            return Err(FieldConfigError::MaskTooWide {
                mask: self.mask,
                width: self.kind.width(),
            });
        }
        if self.value & !self.mask != 0 {
            return Err(FieldConfigError::ValueOutsideMask {
                value: self.value,
                mask: self.mask,
            });
        }
        Ok(())
    }

    pub fn kind(&self) -> FieldType {
        self.kind
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn base_value(&self) -> u32 {
        self.value
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// 第 `pkt_idx` 个包（从 0 开始）的字段值。
    ///
    /// 运算只在掩码选中的比特上进行，以掩码最低位为步长；
    /// `pkt_idx >= count` 时保持最后一个值不变。
    pub fn value_at(&self, pkt_idx: u64) -> u32 {
        let steps = pkt_idx.min(u64::from(self.count).saturating_sub(1));
        let shift = self.mask.trailing_zeros();
        let range = u64::from(self.mask >> shift);
        let base = u64::from(self.value >> shift);
        let v = match self.mode {
            Mode::Increment => base.wrapping_add(steps),
            Mode::Decrement => base.wrapping_sub(steps),
        };
        // range 最多 32 位，截断前已经按 range 取掩码
        (((v & range) as u32) << shift) & self.mask
    }

    /// 把字段值写入包缓冲区 `buf[at..]`，掩码外的比特保持原样。
    pub fn apply(&self, buf: &mut [u8], at: usize, pkt_idx: u64) {
        let width = self.kind.width();
        let Some(slot) = at.checked_add(width).and_then(|end| buf.get_mut(at..end)) else {
            return;
        };
        let mut cur: u32 = 0;
        for b in slot.iter() {
            cur = (cur << 8) | u32::from(*b);
        }
        let next = (cur & !self.mask) | self.value_at(pkt_idx);
        for (i, b) in slot.iter_mut().enumerate() {
            let shift = 8 * (width - 1 - i);
            *b = (next >> shift) as u8;
        }
    }
}
