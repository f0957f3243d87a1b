//! 仿真器
//!
//! 当前仿真时间 + 按 (时间, 序列号) 排序的事件队列。

use std::any::Any;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::{debug, trace};

use super::time::SimTime;

/// 可被调度执行的事件；执行时拿回所有权。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);
}

/// 事件执行时可以访问的可变状态（例如模拟发生器的端口）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Queued {
    at: SimTime,
    seq: u64,
    ev: Box<dyn Event>,
}

// BinaryHeap 是 max-heap，反向比较得到最早时间优先；同一时刻按调度先后。
impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then(self.seq.cmp(&other.seq))
            .reverse()
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Queued {}

/// 事件驱动仿真器。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<Queued>,
}

impl Simulator {
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 队列中尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 丢弃所有尚未执行的事件，返回丢弃的个数。
    pub fn cancel_all(&mut self) -> usize {
        let n = self.q.len();
        self.q.clear();
        n
    }

    /// 调度事件在 `at` 执行；早于当前时间的按当前时间处理。
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        trace!(now = ?self.now, ?at, seq, "调度事件");
        self.q.push(Queued {
            at,
            seq,
            ev: Box::new(ev),
        });
    }

    fn step(&mut self, world: &mut dyn World) -> bool {
        let Some(item) = self.q.pop() else {
            return false;
        };
        self.now = item.at;
        item.ev.execute(self, world);
        true
    }

    /// 执行所有不晚于 `until` 的事件，时间推进到 `until`；返回执行的事件数。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) -> u64 {
        let mut executed = 0;
        while self.q.peek().is_some_and(|top| top.at <= until) && self.step(world) {
            executed += 1;
        }
        self.now = self.now.max(until);
        executed
    }

    /// 运行直到事件队列为空，返回执行的事件数。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) -> u64 {
        let mut executed = 0;
        while self.step(world) {
            executed += 1;
        }
        debug!(executed, now = ?self.now, "事件队列已清空");
        executed
    }
}
