//! # HDMI-CEC Protocol
//!
//! HDMI-CEC 消息模型与设备帧编解码（无硬件依赖）
//!
//! ## 模块
//!
//! - `address`: 逻辑地址 / 物理地址 / 地址字节位域
//! - `message`: 结构化 CEC 消息与常用操作码
//! - `frame`: 设备交换的固定格式帧 `WireFrame` 及编解码
//! - `hal`: HAL 层常量与事件、端口描述类型
//!
//! ## 在架构中的位置
//!
//! ```text
//! HAL facade (hdmi-cec-driver)
//!     ↓ CecMessage / HdmiEvent
//! Protocol Layer (此 crate)
//!     ↓ encode() / decode()
//! WireFrame (struct cec_framedata)
//!     ↓ ioctl
//! Device Layer (hdmi-cec-device)
//! ```

pub mod address;
pub mod frame;
pub mod hal;
pub mod message;

pub use address::*;
pub use frame::*;
pub use hal::*;
pub use message::*;

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid logical address: {0} (expected 0..=15)")]
    InvalidLogicalAddress(u8),

    #[error("Too many arguments: {count} (max {max})")]
    TooManyArguments { count: usize, max: usize },

    #[error("Parse error: {0}")]
    ParseError(String),
}
