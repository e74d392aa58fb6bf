//! 设备句柄
//!
//! 所有设备 IO（调用方线程与监控线程）都经过同一把锁。
//! 锁只在单条命令期间持有，发送方在空闲重试的休眠期间不占用设备。

use crate::error::DriverError;
use hdmi_cec_device::{CecDevice, DeviceError};
use parking_lot::Mutex;
use tracing::{debug, info};

/// 互斥保护的可选设备
#[derive(Default)]
pub struct DeviceHandle {
    device: Mutex<Option<Box<dyn CecDevice>>>,
}

impl DeviceHandle {
    pub fn new(device: impl CecDevice + 'static) -> Self {
        Self::from_boxed(Some(Box::new(device)))
    }

    /// 未打开的句柄：所有命令返回 [`DriverError::NotOpen`]
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn from_boxed(device: Option<Box<dyn CecDevice>>) -> Self {
        Self {
            device: Mutex::new(device),
        }
    }

    pub fn is_open(&self) -> bool {
        self.device.lock().is_some()
    }

    /// 在锁内执行一条设备命令
    pub fn with_device<R>(
        &self,
        f: impl FnOnce(&mut dyn CecDevice) -> Result<R, DeviceError>,
    ) -> Result<R, DriverError> {
        let mut guard = self.device.lock();
        let device = guard.as_mut().ok_or(DriverError::NotOpen)?;
        f(&mut **device).map_err(DriverError::from)
    }

    /// 关闭设备（drop 底层文件描述符）
    pub fn close(&self) {
        if self.device.lock().take().is_some() {
            info!("CEC device closed");
        } else {
            debug!("CEC device already closed");
        }
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("open", &self.is_open())
            .finish()
    }
}
