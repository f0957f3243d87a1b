//! 运行配置
//!
//! 全部取值都可以由环境变量给出，命令行无需任何参数。

use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 被测设备
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    /// 进程内模拟发生器
    Sim,
    /// `host:port` 上的 RPC 设备
    Rpc(String),
}

impl FromStr for DeviceTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("sim") {
            return Ok(DeviceTarget::Sim);
        }
        if s.is_empty() {
            return Err("device must be 'sim' or host:port".into());
        }
        if s.contains(':') {
            Ok(DeviceTarget::Rpc(s.to_string()))
        } else {
            Ok(DeviceTarget::Rpc(format!("{s}:{}", HarnessConfig::DEFAULT_PORT)))
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "vftest",
    about = "Variable-field conformance test: counters must not disturb checksums"
)]
pub struct HarnessConfig {
    /// Device under test: `sim` or host[:port] of an RPC generator
    #[arg(long, env = "VFTEST_DEVICE", default_value = "127.0.0.1:7878")]
    pub device: DeviceTarget,

    /// Fixed wait between start and stop of transmit (ms)
    #[arg(long, env = "VFTEST_TX_WAIT_MS", default_value_t = 12_000)]
    pub tx_wait_ms: u64,

    /// RPC connect/read timeout (ms)
    #[arg(long, env = "VFTEST_CONNECT_TIMEOUT_MS", default_value_t = 5_000)]
    pub connect_timeout_ms: u64,

    /// Also write the report as JSON to this path
    #[arg(long, env = "VFTEST_REPORT_JSON")]
    pub report_json: Option<PathBuf>,
}

impl HarnessConfig {
    pub const DEFAULT_PORT: u16 = 7878;

    /// 测试用：模拟设备、不等待。
    pub fn sim() -> Self {
        Self {
            device: DeviceTarget::Sim,
            tx_wait_ms: 0,
            connect_timeout_ms: 5_000,
            report_json: None,
        }
    }

    pub fn tx_wait(&self) -> Duration {
        Duration::from_millis(self.tx_wait_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
