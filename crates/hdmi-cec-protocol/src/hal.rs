//! HAL 层常量与平台可见类型

use crate::address::PhysicalAddress;
use crate::message::CecMessage;

/// HAL 上报的 CEC 版本
pub const HDMI_CEC_VERSION: u32 = 0x05;

/// HAL 上报的厂商 ID
pub const HDMI_CEC_VENDOR_ID: u32 = 0x000001;

/// 唯一 HDMI 端口的 ID
pub const HDMI_CEC_PORT_ID: u32 = 1;

/// 端口方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PortType {
    Input,
    Output,
}

/// 端口描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortInfo {
    pub port_id: u32,
    pub port_type: PortType,
    pub cec_supported: bool,
    pub arc_supported: bool,
    pub physical_address: PhysicalAddress,
}

/// 异步事件
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HdmiEvent {
    /// 连接状态变化
    HotPlug { connected: bool, port_id: u32 },
    /// 收到一条 CEC 消息
    MessageReceived(CecMessage),
}

impl std::fmt::Display for HdmiEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HdmiEvent::HotPlug { connected, port_id } => {
                let state = if *connected { "connected" } else { "disconnected" };
                write!(f, "hotplug port={} {}", port_id, state)
            },
            HdmiEvent::MessageReceived(msg) => write!(f, "rx {}", msg),
        }
    }
}

/// HDMI 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    Connected,
    NotConnected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// `set_option` 的选项号
///
/// 只有 `Enable` 会作用到设备，其余选项记录日志后忽略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::FromPrimitive, num_enum::IntoPrimitive)]
#[repr(i32)]
pub enum CecOption {
    WakeUp = 0,
    Enable = 1,
    SystemCecControl = 2,
    SetLanguage = 5,
    #[num_enum(catch_all)]
    Other(i32),
}
