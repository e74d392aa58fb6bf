//! 驱动层错误类型定义

use hdmi_cec_device::DeviceError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 设备节点未打开（或已关闭）
    #[error("CEC device not open")]
    NotOpen,

    /// 设备 IO / ioctl 错误
    #[error("CEC device error: {0}")]
    Device(#[from] DeviceError),

    /// 配置加载或解析失败
    #[error("Config error: {0}")]
    Config(String),

    /// 监控线程创建失败
    #[error("Failed to spawn monitor thread: {0}")]
    MonitorSpawn(String),
}

impl DriverError {
    /// 是否为"设备未打开"
    pub fn is_not_open(&self) -> bool {
        matches!(self, DriverError::NotOpen)
    }
}
