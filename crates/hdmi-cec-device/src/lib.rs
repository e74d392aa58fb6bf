//! # HDMI-CEC Device Layer
//!
//! 设备抽象层：CEC 控制器的 ioctl 命令集与可 poll 的状态节点。
//!
//! - [`CecDevice`]: 发送/读取帧、设置/清除逻辑地址、查询物理地址与唤醒状态
//! - [`StatusSource`]: 等待状态变化（紧急数据就绪），读取短文本状态码
//!
//! Linux 下提供 [`IoctlCecDevice`] 与 [`SysfsStatusSource`]；
//! 启用 `mock` feature 后提供可编排的内存实现。

use hdmi_cec_protocol::{LogicalAddress, PhysicalAddress, WireFrame};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::{IoctlCecDevice, SysfsStatusSource};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// 默认设备节点
pub const DEFAULT_DEVICE_PATH: &str = "/dev/cec";

/// 默认状态节点（sysfs，写入时触发 POLLPRI）
pub const DEFAULT_STATUS_PATH: &str = "/sys/devices/virtual/misc/cec/stat";

/// 默认 HDMI 连接状态文件（`0` / `1`）
pub const DEFAULT_CONNECTION_STATE_PATH: &str = "/sys/devices/virtual/switch/hdmi/state";

/// 设备命令（用于错误上下文与日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CecCommand {
    SendFrame,
    SetEnabled,
    PhysicalAddress,
    ReadFrame,
    SetLogicalAddress,
    ClearLogicalAddress,
    WakeState,
}

impl fmt::Display for CecCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CecCommand::SendFrame => "CECSEND",
            CecCommand::SetEnabled => "CECENAB",
            CecCommand::PhysicalAddress => "CECPHY",
            CecCommand::ReadFrame => "CECREAD",
            CecCommand::SetLogicalAddress => "CECSETLA",
            CecCommand::ClearLogicalAddress => "CECCLEARLA",
            CecCommand::WakeState => "CECWAKESTATE",
        };
        f.write_str(name)
    }
}

/// 设备层错误类型
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ioctl {command} failed: {source}")]
    Ioctl {
        command: CecCommand,
        #[source]
        source: std::io::Error,
    },
}

impl DeviceError {
    pub fn ioctl(command: CecCommand, source: impl Into<std::io::Error>) -> Self {
        DeviceError::Ioctl {
            command,
            source: source.into(),
        }
    }
}

/// CEC 控制器命令集
///
/// 所有方法都是同步阻塞调用；调用方负责串行化访问（驱动层用互斥锁包裹）。
pub trait CecDevice: Send {
    fn set_logical_address(&mut self, addr: LogicalAddress) -> Result<(), DeviceError>;

    fn clear_logical_address(&mut self) -> Result<(), DeviceError>;

    fn physical_address(&mut self) -> Result<PhysicalAddress, DeviceError>;

    /// 提交一帧；设备把结果码写回 `frame.result`
    fn send_frame(&mut self, frame: &mut WireFrame) -> Result<(), DeviceError>;

    /// 读取一帧待处理的入站消息
    fn read_frame(&mut self) -> Result<WireFrame, DeviceError>;

    /// 唤醒/空闲状态，0 表示总线空闲
    fn wake_state(&mut self) -> Result<i32, DeviceError>;

    fn set_enabled(&mut self, enabled: bool) -> Result<(), DeviceError>;
}

impl<T: CecDevice + ?Sized> CecDevice for Box<T> {
    fn set_logical_address(&mut self, addr: LogicalAddress) -> Result<(), DeviceError> {
        (**self).set_logical_address(addr)
    }

    fn clear_logical_address(&mut self) -> Result<(), DeviceError> {
        (**self).clear_logical_address()
    }

    fn physical_address(&mut self) -> Result<PhysicalAddress, DeviceError> {
        (**self).physical_address()
    }

    fn send_frame(&mut self, frame: &mut WireFrame) -> Result<(), DeviceError> {
        (**self).send_frame(frame)
    }

    fn read_frame(&mut self) -> Result<WireFrame, DeviceError> {
        (**self).read_frame()
    }

    fn wake_state(&mut self) -> Result<i32, DeviceError> {
        (**self).wake_state()
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), DeviceError> {
        (**self).set_enabled(enabled)
    }
}

/// 可 poll 的状态源
pub trait StatusSource: Send {
    /// 等待状态变化
    ///
    /// - `Ok(true)`: 有新的状态可读
    /// - `Ok(false)`: 超时，或唤醒但没有紧急数据
    /// - `timeout = None` 时无限等待
    fn wait_for_change(&mut self, timeout: Option<Duration>) -> Result<bool, DeviceError>;

    /// 读取当前状态文本
    fn read_status(&mut self) -> Result<String, DeviceError>;
}

impl<T: StatusSource + ?Sized> StatusSource for Box<T> {
    fn wait_for_change(&mut self, timeout: Option<Duration>) -> Result<bool, DeviceError> {
        (**self).wait_for_change(timeout)
    }

    fn read_status(&mut self) -> Result<String, DeviceError> {
        (**self).read_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_display() {
        let err = DeviceError::ioctl(
            CecCommand::SendFrame,
            std::io::Error::from_raw_os_error(5),
        );
        let msg = format!("{}", err);
        assert!(msg.contains("CECSEND"), "message: {}", msg);

    }

    #[test]
    fn test_device_error_from_io() {
        let err: DeviceError = std::io::Error::other("boom").into();
        assert!(matches!(err, DeviceError::Io(_)));
    }
}
