//! 发送作用域
//!
//! 把"正在发送"当作资源：作用域内任何退出路径（正常、校验失败、错误、panic）
//! 都恰好调用一次 `stop_transmit`。

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::device::{DeviceError, GeneratorClient, PortId};

pub struct TransmitScope<'a, C: GeneratorClient + ?Sized> {
    client: &'a mut C,
    ports: Vec<PortId>,
    stopped: bool,
}

impl<'a, C: GeneratorClient + ?Sized> TransmitScope<'a, C> {
    /// 打开作用域；此时还没有开始发送，但退出时一定会停止。
    pub fn new(client: &'a mut C, ports: &[PortId]) -> Self {
        Self {
            client,
            ports: ports.to_vec(),
            stopped: false,
        }
    }

    pub fn start(&mut self) -> Result<(), DeviceError> {
        self.client.start_transmit(&self.ports)
    }

    /// 停止发送；只有第一次调用会真正发给设备。
    pub fn stop(&mut self) -> Result<(), DeviceError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        debug!(ports = ?self.ports, "停止发送");
        self.client.stop_transmit(&self.ports)
    }
}

impl<C: GeneratorClient + ?Sized> Deref for TransmitScope<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.client
    }
}

impl<C: GeneratorClient + ?Sized> DerefMut for TransmitScope<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.client
    }
}

impl<C: GeneratorClient + ?Sized> Drop for TransmitScope<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "尽力停止发送失败");
        }
    }
}
