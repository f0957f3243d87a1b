//! 基于 TCP 的 `GeneratorClient`

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info, trace};

use super::wire::{Payload, Reply, Request};
use crate::device::{DeviceError, GeneratorClient, PortDescriptor, PortId, PortStats, StreamId};
use crate::stream::StreamSpec;

struct Conn {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

pub struct RpcClient {
    addr: String,
    timeout: Duration,
    conn: Option<Conn>,
}

impl RpcClient {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            conn: None,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn call(&mut self, req: &Request) -> Result<Payload, DeviceError> {
        let conn = self.conn.as_mut().ok_or(DeviceError::NotConnected)?;
        let mut line =
            serde_json::to_string(req).map_err(|e| DeviceError::Protocol(e.to_string()))?;
        trace!(request = %line, "rpc ->");
        line.push('\n');
        conn.writer.write_all(line.as_bytes())?;
        conn.writer.flush()?;

        let mut buf = String::new();
        if conn.reader.read_line(&mut buf)? == 0 {
            self.conn = None;
            return Err(DeviceError::Transport(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "device closed the connection",
            )));
        }
        trace!(reply = %buf.trim_end(), "rpc <-");
        let reply: Reply =
            serde_json::from_str(&buf).map_err(|e| DeviceError::Protocol(e.to_string()))?;
        match reply {
            Reply::Ok(p) => Ok(p),
            Reply::Err(e) => Err(e.into()),
        }
    }

    fn call_unit(&mut self, req: Request) -> Result<(), DeviceError> {
        match self.call(&req)? {
            Payload::Unit => Ok(()),
            other => Err(unexpected(&req, &other)),
        }
    }
}

fn unexpected(req: &Request, got: &Payload) -> DeviceError {
    DeviceError::Protocol(format!("unexpected reply {:?} to {:?}", got, req))
}

impl GeneratorClient for RpcClient {
    fn connect(&mut self) -> Result<(), DeviceError> {
        let connect_err = |source| DeviceError::Connect {
            addr: self.addr.clone(),
            source,
        };
        let addrs: Vec<_> = self
            .addr
            .to_socket_addrs()
            .map_err(connect_err)?
            .collect();
        let mut last = None;
        for a in addrs {
            match TcpStream::connect_timeout(&a, self.timeout) {
                Ok(s) => {
                    s.set_read_timeout(Some(self.timeout))?;
                    s.set_nodelay(true)?;
                    let reader = BufReader::new(s.try_clone()?);
                    info!(addr = %a, "🔌 已连接设备");
                    self.conn = Some(Conn { reader, writer: s });
                    return Ok(());
                }
                Err(e) => {
                    debug!(addr = %a, error = %e, "连接尝试失败");
                    last = Some(e);
                }
            }
        }
        let source = last.unwrap_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "address resolved to nothing")
        });
        Err(DeviceError::Connect {
            addr: self.addr.clone(),
            source,
        })
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        if let Some(conn) = self.conn.take() {
            conn.writer.shutdown(std::net::Shutdown::Both).ok();
        }
        Ok(())
    }

    fn list_port_ids(&mut self) -> Result<Vec<PortId>, DeviceError> {
        let req = Request::ListPortIds;
        match self.call(&req)? {
            Payload::PortIds(ids) => Ok(ids),
            other => Err(unexpected(&req, &other)),
        }
    }

    fn get_port_config(&mut self, ports: &[PortId]) -> Result<Vec<PortDescriptor>, DeviceError> {
        let req = Request::GetPortConfig {
            ports: ports.to_vec(),
        };
        match self.call(&req)? {
            Payload::PortConfig(cfg) => Ok(cfg),
            other => Err(unexpected(&req, &other)),
        }
    }

    fn add_stream(&mut self, port: PortId, stream: StreamId) -> Result<(), DeviceError> {
        self.call_unit(Request::AddStream { port, stream })
    }

    fn delete_stream(&mut self, port: PortId, stream: StreamId) -> Result<(), DeviceError> {
        self.call_unit(Request::DeleteStream { port, stream })
    }

    fn configure_stream(
        &mut self,
        port: PortId,
        stream: StreamId,
        spec: &StreamSpec,
    ) -> Result<(), DeviceError> {
        self.call_unit(Request::ConfigureStream {
            port,
            stream,
            spec: spec.clone(),
        })
    }

    fn clear_stats(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.call_unit(Request::ClearStats {
            ports: ports.to_vec(),
        })
    }

    fn get_stats(&mut self, ports: &[PortId]) -> Result<Vec<PortStats>, DeviceError> {
        let req = Request::GetStats {
            ports: ports.to_vec(),
        };
        match self.call(&req)? {
            Payload::Stats(s) => Ok(s),
            other => Err(unexpected(&req, &other)),
        }
    }

    fn start_capture(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.call_unit(Request::StartCapture {
            ports: ports.to_vec(),
        })
    }

    fn stop_capture(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.call_unit(Request::StopCapture {
            ports: ports.to_vec(),
        })
    }

    fn start_transmit(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.call_unit(Request::StartTransmit {
            ports: ports.to_vec(),
        })
    }

    fn stop_transmit(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.call_unit(Request::StopTransmit {
            ports: ports.to_vec(),
        })
    }

    fn fetch_capture_buffer(&mut self, port: PortId) -> Result<Vec<u8>, DeviceError> {
        let req = Request::FetchCaptureBuffer { port };
        match self.call(&req)? {
            Payload::Capture(buf) => Ok(buf),
            other => Err(unexpected(&req, &other)),
        }
    }
}
