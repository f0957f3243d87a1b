//! 模拟端口
//!
//! 模拟发生器的端口状态（仿真世界）和逐帧发送事件。

use std::any::Any;
use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use super::client::{PortDescriptor, PortStats, StreamId};
use crate::sim::{Event, SimTime, Simulator, World};
use crate::stream::StreamSpec;

/// 抓到的一帧
#[derive(Debug, Clone)]
pub(crate) struct Captured {
    pub at: SimTime,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub(crate) struct SimPort {
    pub desc: PortDescriptor,
    pub loopback: bool,
    /// 已添加的流；None 表示尚未配置
    pub streams: BTreeMap<StreamId, Option<StreamSpec>>,
    pub capturing: bool,
    pub capture: Vec<Captured>,
    pub stats: PortStats,
    pub transmitting: bool,
    pub in_flight: u64,
    /// 端口发送忙到何时
    pub busy_until: SimTime,
}

impl SimPort {
    pub fn new(desc: PortDescriptor, loopback: bool) -> Self {
        let stats = PortStats {
            port: desc.id,
            ..PortStats::default()
        };
        Self {
            desc,
            loopback,
            streams: BTreeMap::new(),
            capturing: false,
            capture: Vec::new(),
            stats,
            transmitting: false,
            in_flight: 0,
            busy_until: SimTime::ZERO,
        }
    }
}

/// 模拟发生器的世界：持有全部端口。
#[derive(Debug, Default)]
pub(crate) struct PortWorld {
    pub ports: Vec<SimPort>,
}

impl World for PortWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// 事件：一帧离开端口。回环端口上同一时刻被本端口收到。
#[derive(Debug)]
pub(crate) struct TransmitFrame {
    pub port: usize,
    pub stream: StreamId,
    pub pkt_idx: u64,
    pub frame: Vec<u8>,
}

impl Event for TransmitFrame {
    #[tracing::instrument(skip(self, sim, world), fields(port = self.port, stream = %self.stream, pkt_idx = self.pkt_idx))]
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TransmitFrame { port, frame, .. } = *self;
        let Some(w) = world.as_any_mut().downcast_mut::<PortWorld>() else {
            warn!("世界不是 PortWorld，丢弃该帧");
            return;
        };
        let Some(p) = w.ports.get_mut(port) else {
            return;
        };
        p.in_flight = p.in_flight.saturating_sub(1);
        if !p.transmitting {
            trace!("端口已停止发送，丢弃");
            return;
        }

        let bytes = frame.len() as u64;
        p.stats.tx_pkts += 1;
        p.stats.tx_bytes += bytes;
        if p.loopback {
            p.stats.rx_pkts += 1;
            p.stats.rx_bytes += bytes;
            if p.capturing {
                p.capture.push(Captured {
                    at: sim.now(),
                    data: frame,
                });
            }
        }
        if p.in_flight == 0 {
            debug!(tx_pkts = p.stats.tx_pkts, "发送完成");
            p.transmitting = false;
        }
    }
}
