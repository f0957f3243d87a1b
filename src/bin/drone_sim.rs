//! 模拟发生器服务
//!
//! 在 TCP 上提供模拟发生器（一个 `lo` 回环端口），供 `vftest` 通过 RPC 测试。

use clap::Parser;
use std::net::TcpListener;
use tracing::info;
use vftest_rs::device::SimGenerator;
use vftest_rs::rpc::serve;

#[derive(Debug, Parser)]
#[command(name = "drone-sim", about = "Simulated packet generator served over JSON-lines RPC")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:7878")]
    listen: String,

    /// Line rate of the simulated ports (Mbps)
    #[arg(long, default_value_t = 1_000)]
    rate_mbps: u64,

    /// Exit after serving this many connections
    #[arg(long)]
    max_conns: Option<usize>,
}

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let listener = TcpListener::bind(&args.listen)?;
    info!(addr = %listener.local_addr()?, "📡 模拟发生器开始监听");

    let mut device = SimGenerator::new().with_line_rate(args.rate_mbps.saturating_mul(1_000_000));
    serve(&listener, &mut device, args.max_conns)
}
