//! 地址类型
//!
//! - [`LogicalAddress`]: 总线上的角色地址（0..=15，15 为广播/未注册）
//! - [`PhysicalAddress`]: 由 HDMI 端口级联深度决定的拓扑地址（`a.b.c.d`）
//! - [`AddressByte`]: 帧头的 源/目的 半字节对

use crate::ProtocolError;
use num_enum::FromPrimitive;
use std::fmt;
use std::str::FromStr;

pub use bits::AddressByte;

/// CEC 逻辑地址
///
/// 半字节到逻辑地址的转换是全函数：16 个取值都有对应角色，
/// 超出 4 bit 的输入由 `from_nibble` 截断。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    num_enum::FromPrimitive,
    num_enum::IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum LogicalAddress {
    Tv = 0,
    Recording1 = 1,
    Recording2 = 2,
    Tuner1 = 3,
    Playback1 = 4,
    AudioSystem = 5,
    Tuner2 = 6,
    Tuner3 = 7,
    Playback2 = 8,
    Recording3 = 9,
    Tuner4 = 10,
    Playback3 = 11,
    Backup1 = 12,
    Backup2 = 13,
    Specific = 14,
    /// 作为目的地址表示广播，作为源地址表示未注册设备
    #[default]
    Broadcast = 15,
}

impl LogicalAddress {
    /// 从半字节构造（只取低 4 bit）
    pub fn from_nibble(value: u8) -> Self {
        Self::from_primitive(value & 0x0F)
    }

    /// 严格构造：拒绝 > 15 的取值
    pub fn new(value: u8) -> Result<Self, ProtocolError> {
        if value > 0x0F {
            return Err(ProtocolError::InvalidLogicalAddress(value));
        }
        Ok(Self::from_nibble(value))
    }

    /// 4 bit 数值
    pub fn nibble(self) -> u8 {
        u8::from(self)
    }

    pub fn is_broadcast(self) -> bool {
        self == Self::Broadcast
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.nibble())
    }
}

impl FromStr for LogicalAddress {
    type Err = ProtocolError;

    /// 接受数字（`4`、`0x4`）或角色名（`tv`、`playback1`、`broadcast`，不区分大小写）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(value) = parse_u8(s) {
            return Self::new(value);
        }

        let addr = match s.to_ascii_lowercase().as_str() {
            "tv" => Self::Tv,
            "recording1" => Self::Recording1,
            "recording2" => Self::Recording2,
            "recording3" => Self::Recording3,
            "tuner1" => Self::Tuner1,
            "tuner2" => Self::Tuner2,
            "tuner3" => Self::Tuner3,
            "tuner4" => Self::Tuner4,
            "playback1" => Self::Playback1,
            "playback2" => Self::Playback2,
            "playback3" => Self::Playback3,
            "audiosystem" | "audio" => Self::AudioSystem,
            "backup1" => Self::Backup1,
            "backup2" => Self::Backup2,
            "specific" => Self::Specific,
            "broadcast" | "unregistered" => Self::Broadcast,
            other => {
                return Err(ProtocolError::ParseError(format!(
                    "unknown logical address '{}'",
                    other
                )));
            },
        };
        Ok(addr)
    }
}

/// CEC 物理地址
///
/// 16 bit，每个半字节对应一级端口：`0x1200` 表示 `1.2.0.0`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhysicalAddress(pub u16);

impl PhysicalAddress {
    /// 未连接 / 无效地址
    pub const INVALID: Self = Self(0xFFFF);

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    /// 四级端口号（最高半字节在前）
    pub fn digits(self) -> [u8; 4] {
        [
            ((self.0 >> 12) & 0xF) as u8,
            ((self.0 >> 8) & 0xF) as u8,
            ((self.0 >> 4) & 0xF) as u8,
            (self.0 & 0xF) as u8,
        ]
    }
}

impl From<u16> for PhysicalAddress {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.digits();
        write!(f, "{:x}.{:x}.{:x}.{:x}", a, b, c, d)
    }
}

impl FromStr for PhysicalAddress {
    type Err = ProtocolError;

    /// 接受 `a.b.c.d` 或十六进制 `0x1200`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u16::from_str_radix(hex, 16)
                .map(Self)
                .map_err(|e| ProtocolError::ParseError(format!("physical address '{}': {}", s, e)));
        }

        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 4 {
            return Err(ProtocolError::ParseError(format!(
                "physical address '{}' must look like a.b.c.d",
                s
            )));
        }
        let mut raw = 0u16;
        for part in parts {
            let digit = u8::from_str_radix(part, 16)
                .ok()
                .filter(|d| *d <= 0xF)
                .ok_or_else(|| {
                    ProtocolError::ParseError(format!("physical address digit '{}'", part))
                })?;
            raw = (raw << 4) | digit as u16;
        }
        Ok(Self(raw))
    }
}

/// 解析十进制或 `0x` 前缀十六进制字节
pub(crate) fn parse_u8(s: &str) -> Option<u8> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).ok()
    } else {
        s.parse::<u8>().ok()
    }
}

mod bits {
    use super::LogicalAddress;
    use bilge::prelude::*;

    /// 帧头地址字节
    ///
    /// 协议定义：
    /// - Bit 0-3: 目的逻辑地址
    /// - Bit 4-7: 源（发起方）逻辑地址
    ///
    /// bilge 默认 LSB first，低半字节在前声明。
    #[bitsize(8)]
    #[derive(FromBits, DebugBits, Clone, Copy)]
    pub struct AddressByte {
        pub destination: u4,
        pub initiator: u4,
    }

    impl AddressByte {
        /// (initiator << 4) | destination
        pub fn pack(initiator: LogicalAddress, destination: LogicalAddress) -> core::primitive::u8 {
            let byte = AddressByte::new(u4::new(destination.nibble()), u4::new(initiator.nibble()));
            u8::from(byte).value()
        }

        /// 拆分为 (initiator, destination)
        pub fn unpack(raw: core::primitive::u8) -> (LogicalAddress, LogicalAddress) {
            let byte = AddressByte::from(u8::new(raw));
            (
                LogicalAddress::from_nibble(byte.initiator().value()),
                LogicalAddress::from_nibble(byte.destination().value()),
            )
        }
    }
}
