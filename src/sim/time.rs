//! 仿真时间类型
//!
//! 纳秒精度的仿真时间，以及抓包时间戳所需的换算。

/// 仿真时间（纳秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }

    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }

    pub fn saturating_add(self, other: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(other.0))
    }

    /// 以 `bps` 的线速发送 `bytes` 字节所需时间（向上取整）。
    pub fn serialization(bytes: usize, bps: u64) -> SimTime {
        if bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bits = (bytes as u128).saturating_mul(8);
        let nanos = (bits.saturating_mul(1_000_000_000u128) + (bps as u128 - 1)) / bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }

    /// 拆成 pcap 记录头使用的 (秒, 微秒)。
    pub fn to_pcap_ts(self) -> (u32, u32) {
        let secs = self.0 / 1_000_000_000;
        let usecs = (self.0 % 1_000_000_000) / 1_000;
        (secs.min(u32::MAX as u64) as u32, usecs as u32)
    }
}
