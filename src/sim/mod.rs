//! 离散事件仿真核心
//!
//! 模拟发生器用它按线速推进发包时间线。

mod simulator;
mod time;

pub use simulator::{Event, Simulator, World};
pub use time::SimTime;
