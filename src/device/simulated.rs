//! 进程内模拟发生器
//!
//! 一个 `lo` 回环端口加一个普通端口；发送按线速在仿真时间上推进，
//! 回环端口上的抓包写成 pcap 返回。

use tracing::{debug, info, instrument};

use super::client::{
    DeviceError, GeneratorClient, PortDescriptor, PortId, PortStats, StreamId,
};
use super::frame::{render_packet, render_template};
use super::pcap::write_capture;
use super::port::{PortWorld, SimPort, TransmitFrame};
use crate::sim::{SimTime, Simulator};
use crate::stream::{FCS_LEN, StreamSpec};

/// 前导码 + 帧间隔
const WIRE_OVERHEAD: usize = 20;
pub const DEFAULT_LINE_RATE_BPS: u64 = 1_000_000_000;

pub struct SimGenerator {
    connected: bool,
    line_rate_bps: u64,
    sim: Simulator,
    world: PortWorld,
}

impl Default for SimGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimGenerator {
    /// 默认端口：0 = eth0，1 = lo（回环）。
    pub fn new() -> Self {
        let mut world = PortWorld::default();
        world.ports.push(SimPort::new(
            PortDescriptor {
                id: PortId(0),
                name: "eth0".into(),
                description: "Simulated Ethernet port".into(),
            },
            false,
        ));
        world.ports.push(SimPort::new(
            PortDescriptor {
                id: PortId(1),
                name: "lo".into(),
                description: "Loopback interface".into(),
            },
            true,
        ));
        Self {
            connected: false,
            line_rate_bps: DEFAULT_LINE_RATE_BPS,
            sim: Simulator::default(),
            world,
        }
    }

    /// 没有任何端口的设备。
    pub fn without_ports() -> Self {
        Self {
            world: PortWorld::default(),
            ..Self::new()
        }
    }

    pub fn with_line_rate(mut self, bps: u64) -> Self {
        self.line_rate_bps = bps;
        self
    }

    /// 追加一个端口，返回其编号。
    pub fn add_port(&mut self, name: &str, description: &str, loopback: bool) -> PortId {
        let id = PortId(self.world.ports.len() as u32);
        self.world.ports.push(SimPort::new(
            PortDescriptor {
                id,
                name: name.into(),
                description: description.into(),
            },
            loopback,
        ));
        id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_transmitting(&self, port: PortId) -> bool {
        self.world
            .ports
            .get(port.0 as usize)
            .is_some_and(|p| p.transmitting)
    }

    /// 当前仿真时间
    pub fn now(&self) -> SimTime {
        self.sim.now()
    }

    fn ensure_connected(&self) -> Result<(), DeviceError> {
        if self.connected {
            Ok(())
        } else {
            Err(DeviceError::NotConnected)
        }
    }

    fn port_mut(&mut self, id: PortId) -> Result<&mut SimPort, DeviceError> {
        self.ensure_connected()?;
        self.world
            .ports
            .get_mut(id.0 as usize)
            .ok_or(DeviceError::UnknownPort(id))
    }

    /// 先校验全部端口编号，再逐个执行，避免部分生效。
    fn each_port(
        &mut self,
        ids: &[PortId],
        mut f: impl FnMut(&mut SimPort),
    ) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        if let Some(bad) = ids
            .iter()
            .find(|id| id.0 as usize >= self.world.ports.len())
        {
            return Err(DeviceError::UnknownPort(*bad));
        }
        for id in ids {
            f(&mut self.world.ports[id.0 as usize]);
        }
        Ok(())
    }

    fn schedule_port(&mut self, idx: usize) -> u64 {
        let rate = self.line_rate_bps;
        let now = self.sim.now();
        let port = &mut self.world.ports[idx];
        let mut at = now.max(port.busy_until);
        let mut frames = Vec::new();
        for (sid, spec) in &port.streams {
            let Some(spec) = spec else {
                continue;
            };
            let template = render_template(spec);
            let gap = SimTime::serialization(spec.wire_len() + FCS_LEN + WIRE_OVERHEAD, rate);
            for pkt_idx in 0..spec.packet_count() {
                at = at.saturating_add(gap);
                frames.push((
                    at,
                    TransmitFrame {
                        port: idx,
                        stream: *sid,
                        pkt_idx,
                        frame: render_packet(spec, &template, pkt_idx),
                    },
                ));
            }
        }
        let n = frames.len() as u64;
        port.busy_until = at;
        port.in_flight += n;
        port.transmitting = port.in_flight > 0;
        for (t, ev) in frames {
            self.sim.schedule(t, ev);
        }
        n
    }
}

impl GeneratorClient for SimGenerator {
    fn connect(&mut self) -> Result<(), DeviceError> {
        info!("🔌 模拟发生器已连接");
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DeviceError> {
        self.connected = false;
        Ok(())
    }

    fn list_port_ids(&mut self) -> Result<Vec<PortId>, DeviceError> {
        self.ensure_connected()?;
        Ok(self.world.ports.iter().map(|p| p.desc.id).collect())
    }

    fn get_port_config(&mut self, ports: &[PortId]) -> Result<Vec<PortDescriptor>, DeviceError> {
        self.ensure_connected()?;
        ports
            .iter()
            .map(|id| {
                self.world
                    .ports
                    .get(id.0 as usize)
                    .map(|p| p.desc.clone())
                    .ok_or(DeviceError::UnknownPort(*id))
            })
            .collect()
    }

    fn add_stream(&mut self, port: PortId, stream: StreamId) -> Result<(), DeviceError> {
        let p = self.port_mut(port)?;
        if p.streams.contains_key(&stream) {
            return Err(DeviceError::DuplicateStream { port, stream });
        }
        p.streams.insert(stream, None);
        Ok(())
    }

    fn delete_stream(&mut self, port: PortId, stream: StreamId) -> Result<(), DeviceError> {
        let p = self.port_mut(port)?;
        p.streams
            .remove(&stream)
            .map(|_| ())
            .ok_or(DeviceError::UnknownStream { port, stream })
    }

    fn configure_stream(
        &mut self,
        port: PortId,
        stream: StreamId,
        spec: &StreamSpec,
    ) -> Result<(), DeviceError> {
        let p = self.port_mut(port)?;
        let Some(slot) = p.streams.get_mut(&stream) else {
            return Err(DeviceError::UnknownStream { port, stream });
        };
        spec.validate()
            .map_err(|e| DeviceError::Rejected(e.to_string()))?;
        debug!(%port, %stream, packets = spec.packet_count(), "流配置已接受");
        *slot = Some(spec.clone());
        Ok(())
    }

    fn clear_stats(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.each_port(ports, |p| {
            p.stats = PortStats {
                port: p.desc.id,
                ..PortStats::default()
            };
        })
    }

    fn get_stats(&mut self, ports: &[PortId]) -> Result<Vec<PortStats>, DeviceError> {
        let mut out = Vec::with_capacity(ports.len());
        self.each_port(ports, |p| out.push(p.stats.clone()))?;
        Ok(out)
    }

    fn start_capture(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.each_port(ports, |p| {
            p.capture.clear();
            p.capturing = true;
        })
    }

    fn stop_capture(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.each_port(ports, |p| p.capturing = false)
    }

    #[instrument(skip(self))]
    fn start_transmit(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.each_port(ports, |_| {})?;
        let mut scheduled = 0;
        for id in ports {
            let idx = id.0 as usize;
            if self.world.ports[idx].transmitting {
                continue;
            }
            scheduled += self.schedule_port(idx);
        }
        info!(scheduled, "▶️  开始发送");
        // 调用方看到的是"已发完"的设备：时间线一次推进到底
        let executed = self.sim.run(&mut self.world);
        debug!(executed, now = ?self.sim.now(), "发送时间线推进完毕");
        Ok(())
    }

    fn stop_transmit(&mut self, ports: &[PortId]) -> Result<(), DeviceError> {
        self.each_port(ports, |p| p.transmitting = false)
    }

    fn fetch_capture_buffer(&mut self, port: PortId) -> Result<Vec<u8>, DeviceError> {
        let p = self.port_mut(port)?;
        let mut out = Vec::new();
        write_capture(
            &mut out,
            p.capture.iter().map(|c| (c.at, c.data.as_slice())),
        )?;
        debug!(%port, frames = p.capture.len(), bytes = out.len(), "导出抓包缓冲区");
        Ok(out)
    }
}
