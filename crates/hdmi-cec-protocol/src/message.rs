//! 结构化 CEC 消息

use crate::address::{LogicalAddress, parse_u8};
use crate::ProtocolError;
use smallvec::SmallVec;
use std::fmt;

/// 单条消息允许的最大参数字节数
///
/// 设备帧的 body 为 1 字节 opcode + 参数；超过此值的参数列表在编码时被清空。
pub const MAX_MESSAGE_ARGS: usize = 14;

/// 参数存储（≤15 字节时不分配堆内存）
pub type CecArgs = SmallVec<[u8; 15]>;

/// CEC 消息
///
/// 总编码长度 = 1 (opcode) + `args.len()`。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CecMessage {
    pub initiator: LogicalAddress,
    pub destination: LogicalAddress,
    pub opcode: u8,
    pub args: CecArgs,
}

impl CecMessage {
    /// 构造消息（不校验参数长度，超长参数在编码时被丢弃）
    pub fn new(
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: impl Into<u8>,
        args: &[u8],
    ) -> Self {
        Self {
            initiator,
            destination,
            opcode: opcode.into(),
            args: CecArgs::from_slice(args),
        }
    }

    /// 构造消息并拒绝超过 [`MAX_MESSAGE_ARGS`] 的参数列表
    pub fn try_new(
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: impl Into<u8>,
        args: &[u8],
    ) -> Result<Self, ProtocolError> {
        if args.len() > MAX_MESSAGE_ARGS {
            return Err(ProtocolError::TooManyArguments {
                count: args.len(),
                max: MAX_MESSAGE_ARGS,
            });
        }
        Ok(Self::new(initiator, destination, opcode, args))
    }

    /// 编码后的 body 长度（opcode + 参数）
    pub fn len(&self) -> usize {
        1 + self.args.len()
    }

    /// body 至少包含 opcode，永不为空
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 已知操作码（未知时为 `None`）
    pub fn known_opcode(&self) -> Option<CecOpcode> {
        CecOpcode::try_from(self.opcode).ok()
    }

    pub fn is_broadcast(&self) -> bool {
        self.destination.is_broadcast()
    }
}

impl fmt::Display for CecMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:x}{:x}:{:02x}",
            self.initiator.nibble(),
            self.destination.nibble(),
            self.opcode
        )?;
        for arg in &self.args {
            write!(f, ":{:02x}", arg)?;
        }
        Ok(())
    }
}

/// 解析 `cec-ctl` 风格的字节串，如 `"82:10:00"` 或 `"0x82 0x10 0x00"`
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, ProtocolError> {
    s.split(|c: char| c == ':' || c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let hex = part
                .strip_prefix("0x")
                .or_else(|| part.strip_prefix("0X"))
                .unwrap_or(part);
            u8::from_str_radix(hex, 16)
                .map_err(|e| ProtocolError::ParseError(format!("byte '{}': {}", part, e)))
        })
        .collect()
}

/// 解析操作码：十六进制字节（`0x36`/`36`）或已知操作码名（`standby`）
pub fn parse_opcode(s: &str) -> Result<u8, ProtocolError> {
    let s = s.trim();
    if let Some(op) = CecOpcode::from_name(s) {
        return Ok(op.into());
    }
    if s.starts_with("0x") || s.starts_with("0X") {
        return parse_u8(s).ok_or_else(|| ProtocolError::ParseError(format!("opcode '{}'", s)));
    }
    u8::from_str_radix(s, 16).map_err(|e| ProtocolError::ParseError(format!("opcode '{}': {}", s, e)))
}

/// 常用 CEC 操作码（HDMI 1.4b CEC 表 8 子集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CecOpcode {
    FeatureAbort = 0x00,
    ImageViewOn = 0x04,
    TextViewOn = 0x0D,
    Standby = 0x36,
    UserControlPressed = 0x44,
    UserControlReleased = 0x45,
    GiveOsdName = 0x46,
    SetOsdName = 0x47,
    RoutingChange = 0x80,
    RoutingInformation = 0x81,
    ActiveSource = 0x82,
    GivePhysicalAddress = 0x83,
    ReportPhysicalAddress = 0x84,
    RequestActiveSource = 0x85,
    SetStreamPath = 0x86,
    DeviceVendorId = 0x87,
    VendorCommand = 0x89,
    GiveDeviceVendorId = 0x8C,
    MenuRequest = 0x8D,
    MenuStatus = 0x8E,
    GiveDevicePowerStatus = 0x8F,
    /// 单参数上报；编码时参数被规范化为 0（On）
    ReportPowerStatus = 0x90,
    GetMenuLanguage = 0x91,
    InactiveSource = 0x9D,
    CecVersion = 0x9E,
    GetCecVersion = 0x9F,
    VendorCommandWithId = 0xA0,
    ReportAudioStatus = 0x7A,
    GiveAudioStatus = 0x71,
    SetSystemAudioMode = 0x72,
    SystemAudioModeRequest = 0x70,
    InitiateArc = 0xC0,
    ReportArcInitiated = 0xC1,
    ReportArcTerminated = 0xC2,
    RequestArcInitiation = 0xC3,
    RequestArcTermination = 0xC4,
    TerminateArc = 0xC5,
    Abort = 0xFF,
}

impl CecOpcode {
    fn from_name(name: &str) -> Option<Self> {
        let op = match name.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "featureabort" => Self::FeatureAbort,
            "imageviewon" => Self::ImageViewOn,
            "textviewon" => Self::TextViewOn,
            "standby" => Self::Standby,
            "usercontrolpressed" => Self::UserControlPressed,
            "usercontrolreleased" => Self::UserControlReleased,
            "giveosdname" => Self::GiveOsdName,
            "setosdname" => Self::SetOsdName,
            "activesource" => Self::ActiveSource,
            "givephysicaladdress" => Self::GivePhysicalAddress,
            "reportphysicaladdress" => Self::ReportPhysicalAddress,
            "requestactivesource" => Self::RequestActiveSource,
            "givedevicevendorid" => Self::GiveDeviceVendorId,
            "devicevendorid" => Self::DeviceVendorId,
            "givedevicepowerstatus" => Self::GiveDevicePowerStatus,
            "reportpowerstatus" => Self::ReportPowerStatus,
            "getcecversion" => Self::GetCecVersion,
            "cecversion" => Self::CecVersion,
            "inactivesource" => Self::InactiveSource,
            "abort" => Self::Abort,
            _ => return None,
        };
        Some(op)
    }
}
