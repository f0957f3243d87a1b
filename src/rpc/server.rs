//! 把任意 `GeneratorClient` 暴露为 RPC 服务。
//!
//! 连接按顺序逐个处理，与测试端的单线程约定一致。

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

use tracing::{debug, info, warn};

use super::wire::{Payload, RemoteError, Reply, Request};
use crate::device::GeneratorClient;

/// 执行一个请求并生成应答。
pub fn dispatch<C: GeneratorClient + ?Sized>(device: &mut C, req: Request) -> Reply {
    let res = match req {
        Request::ListPortIds => device.list_port_ids().map(Payload::PortIds),
        Request::GetPortConfig { ports } => device.get_port_config(&ports).map(Payload::PortConfig),
        Request::AddStream { port, stream } => {
            device.add_stream(port, stream).map(|_| Payload::Unit)
        }
        Request::DeleteStream { port, stream } => {
            device.delete_stream(port, stream).map(|_| Payload::Unit)
        }
        Request::ConfigureStream { port, stream, spec } => device
            .configure_stream(port, stream, &spec)
            .map(|_| Payload::Unit),
        Request::ClearStats { ports } => device.clear_stats(&ports).map(|_| Payload::Unit),
        Request::GetStats { ports } => device.get_stats(&ports).map(Payload::Stats),
        Request::StartCapture { ports } => device.start_capture(&ports).map(|_| Payload::Unit),
        Request::StopCapture { ports } => device.stop_capture(&ports).map(|_| Payload::Unit),
        Request::StartTransmit { ports } => device.start_transmit(&ports).map(|_| Payload::Unit),
        Request::StopTransmit { ports } => device.stop_transmit(&ports).map(|_| Payload::Unit),
        Request::FetchCaptureBuffer { port } => {
            device.fetch_capture_buffer(port).map(Payload::Capture)
        }
    };
    match res {
        Ok(p) => Reply::Ok(p),
        Err(e) => {
            debug!(error = %e, "请求失败");
            Reply::Err(RemoteError::from(&e))
        }
    }
}

/// 服务一个连接直到对端关闭。会话开始时连接设备，结束时断开。
pub fn serve_connection<C: GeneratorClient + ?Sized>(
    stream: TcpStream,
    device: &mut C,
) -> io::Result<()> {
    let peer = stream.peer_addr().ok();
    info!(?peer, "客户端已连接");
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);

    if let Err(e) = device.connect() {
        warn!(error = %e, "设备连接失败");
    }
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = match serde_json::from_str::<Request>(&line) {
            Ok(req) => {
                debug!(?req, "收到请求");
                dispatch(device, req)
            }
            Err(e) => Reply::Err(RemoteError {
                kind: crate::device::RemoteErrorKind::Other,
                message: format!("malformed request: {e}"),
            }),
        };
        let mut out = serde_json::to_string(&reply).map_err(io::Error::other)?;
        out.push('\n');
        writer.write_all(out.as_bytes())?;
        writer.flush()?;
    }
    if let Err(e) = device.disconnect() {
        warn!(error = %e, "设备断开失败");
    }
    info!(?peer, "客户端已断开");
    Ok(())
}

/// 顺序处理 `listener` 上的连接；`max_conns` 为 None 时一直运行。
pub fn serve<C: GeneratorClient + ?Sized>(
    listener: &TcpListener,
    device: &mut C,
    max_conns: Option<usize>,
) -> io::Result<()> {
    let mut served = 0usize;
    for stream in listener.incoming() {
        match stream {
            Ok(s) => {
                if let Err(e) = serve_connection(s, device) {
                    warn!(error = %e, "连接异常结束");
                }
            }
            Err(e) => warn!(error = %e, "accept 失败"),
        }
        served += 1;
        if max_conns.is_some_and(|max| served >= max) {
            break;
        }
    }
    Ok(())
}
