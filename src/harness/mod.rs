//! 测试编排
//!
//! 配置 → 清统计 → 开抓包 → 开发送 → 等待 → 停发送 → 停抓包 → 取抓包 → 校验 → 清理。

mod cases;
mod config;
mod guard;
mod run;

pub use cases::{
    COUNTER16_CASE, COUNTER32_IP6_CASE, CASES, CaseDef, counter16_ip4_stream,
    counter32_ip6_stream,
};
pub use config::{DeviceTarget, HarnessConfig};
pub use guard::TransmitScope;
pub use run::{RunError, run_case, run_suite, transmit_and_capture};
