//! 套件执行
//!
//! 连接设备、选回环端口、逐个运行用例并记账。远端错误不重试。

use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::cases::{CASES, CaseDef};
use super::config::HarnessConfig;
use super::guard::TransmitScope;
use crate::capture::{CaptureVerifier, DissectError, Dissector};
use crate::device::{DeviceError, GeneratorClient, PortId, StreamId, find_loopback_port};
use crate::stream::StreamError;
use crate::suite::{HarnessError, TestSuite};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("invalid stream config: {0}")]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Dissect(#[from] DissectError),
    #[error("harness misuse: {0}")]
    Harness(#[from] HarnessError),
    #[error("device has no ports")]
    NoPorts,
    #[error("loopback port not found")]
    NoLoopbackPort,
}

impl RunError {
    /// 只影响当前用例的错误；其余错误中止整个套件。
    pub fn is_case_local(&self) -> bool {
        matches!(self, RunError::Stream(_) | RunError::Dissect(_))
    }

    /// 进程退出码：脚本错误或拓扑不满足为 1，其余（套件未完成）为 2。
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Harness(_) | RunError::NoPorts | RunError::NoLoopbackPort => 1,
            _ => 2,
        }
    }
}

/// 开抓包 → 开发送 → 固定等待 → 停发送 → 停抓包 → 取抓包。
pub fn transmit_and_capture<C: GeneratorClient + ?Sized>(
    dev: &mut TransmitScope<'_, C>,
    port: PortId,
    wait: Duration,
) -> Result<Vec<u8>, DeviceError> {
    let rx = [port];
    dev.start_capture(&rx)?;
    dev.start()?;
    info!(wait_ms = wait.as_millis() as u64, "等待发送完成 ...");
    thread::sleep(wait);
    dev.stop()?;
    dev.stop_capture(&rx)?;

    for s in dev.get_stats(&rx)? {
        info!(
            port = %s.port,
            tx_pkts = s.tx_pkts,
            tx_bytes = s.tx_bytes,
            rx_pkts = s.rx_pkts,
            rx_bytes = s.rx_bytes,
            "端口统计"
        );
    }
    info!("获取抓包缓冲区");
    dev.fetch_capture_buffer(port)
}

/// 单个用例的测试体，返回校验是否通过。
pub fn run_case<C: GeneratorClient + ?Sized, D: Dissector + ?Sized>(
    client: &mut C,
    dissector: &D,
    port: PortId,
    stream: StreamId,
    case: &CaseDef,
    wait: Duration,
) -> Result<bool, RunError> {
    // 配置错误在任何远端调用之前暴露
    let spec = (case.stream)()?;
    let ports = [port];
    let mut dev = TransmitScope::new(client, &ports);

    info!(%stream, "添加并配置发送流");
    dev.add_stream(port, stream)?;
    dev.configure_stream(port, stream, &spec)?;
    dev.clear_stats(&ports)?;

    let blob = transmit_and_capture(&mut dev, port, wait)?;
    drop(dev);

    let packets = dissector.dissect(&blob)?;
    debug!(packets = packets.len(), "抓包已解析");
    let verifier = CaptureVerifier::new(case.invariants.iter().copied());
    match verifier.check_stream(&packets, &spec) {
        Ok(()) => Ok(true),
        Err(m) => {
            warn!(mismatch = %m, "❌ 抓包与预期不符");
            Ok(false)
        }
    }
}

/// 跑完整个套件。返回 Err 时套件未完成，但已结束的用例都已记账。
pub fn run_suite<C: GeneratorClient + ?Sized, D: Dissector + ?Sized>(
    client: &mut C,
    dissector: &D,
    cfg: &HarnessConfig,
    suite: &mut TestSuite,
) -> Result<(), RunError> {
    info!(device = ?cfg.device, "连接设备");
    client.connect()?;

    info!("获取端口列表");
    let ids = client.list_port_ids()?;
    let ports = client.get_port_config(&ids)?;
    if ports.is_empty() {
        warn!("设备没有任何端口！");
        return Err(RunError::NoPorts);
    }

    println!("Port List");
    println!("---------");
    for p in &ports {
        println!("{}.{} ({})", p.id, p.name, p.description);
    }
    let Some(port) = find_loopback_port(&ports) else {
        warn!("找不到回环端口");
        return Err(RunError::NoLoopbackPort);
    };
    println!("Using port {} as tx/rx port(s)", port);

    for (i, case) in CASES.iter().enumerate() {
        let stream = StreamId(i as u32 + 1);
        let res = suite.run_case(case.name, || {
            run_case(&mut *client, dissector, port, stream, case, cfg.tx_wait())
        });

        if let Err(e) = client.delete_stream(port, stream) {
            debug!(error = %e, %stream, "删除流失败");
        }
        match res {
            Ok(_) => {}
            Err(e) if e.is_case_local() => warn!(test = case.name, error = %e, "用例失败"),
            Err(e) => return Err(e),
        }
    }

    suite.complete();
    client.disconnect()?;
    Ok(())
}
