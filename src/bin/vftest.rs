//! 可变字段一致性测试
//!
//! 通过环境变量选择设备，运行套件，总是打印报告；
//! 全部通过退出码 0，未完成或有失败为 2，脚本错误或找不到回环端口为 1。

use clap::Parser;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use tracing::{error, info, warn};
use vftest_rs::capture::PcapDissector;
use vftest_rs::device::{GeneratorClient, SimGenerator};
use vftest_rs::harness::{DeviceTarget, HarnessConfig, run_suite};
use vftest_rs::rpc::RpcClient;
use vftest_rs::suite::TestSuite;

const EXIT_MISUSE: u8 = 1;
const EXIT_INCOMPLETE: u8 = 2;

fn print_topology() {
    println!();
    println!("This test uses the following topology -");
    println!();
    println!(" +-----------+           ");
    println!(" |           |Tx--->----+");
    println!(" | Generator |          |");
    println!(" |           |Rx---<----+");
    println!(" +-----------+           ");
    println!();
    println!("A loopback port is used as both the Tx and Rx ports");
    println!();
}

fn main() -> ExitCode {
    // 日志写 stderr，stdout 只留给横幅和报告
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cfg = HarnessConfig::parse();
    print_topology();

    let mut device: Box<dyn GeneratorClient> = match &cfg.device {
        DeviceTarget::Sim => Box::new(SimGenerator::new()),
        DeviceTarget::Rpc(addr) => Box::new(RpcClient::new(addr.clone(), cfg.connect_timeout())),
    };
    let mut suite = TestSuite::new();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        run_suite(device.as_mut(), &PcapDissector, &cfg, &mut suite)
    }));

    let report = suite.report();
    print!("{report}");
    if let Some(path) = &cfg.report_json {
        match report.to_json() {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    warn!(path = %path.display(), error = %e, "写 JSON 报告失败");
                }
            }
            Err(e) => warn!(error = %e, "序列化报告失败"),
        }
    }

    let code = match outcome {
        Ok(Ok(())) if suite.all_passed() => 0,
        Ok(Ok(())) => EXIT_INCOMPLETE,
        Ok(Err(e)) => {
            error!(error = %e, "测试套件中止");
            e.exit_code()
        }
        Err(_) => {
            error!("💥 测试套件 panic");
            EXIT_MISUSE
        }
    };
    info!(
        passed = suite.passed(),
        total = suite.total(),
        completed = suite.is_completed(),
        code,
        "运行结束"
    );
    ExitCode::from(code)
}
