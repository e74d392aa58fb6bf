//! 设备帧格式与编解码
//!
//! `WireFrame` 与驱动交换的 `struct cec_framedata` 布局一致：
//!
//! ```text
//! +------------+--------+-----------------+-----------+-----------+
//! | srcdest(1) | op(1)  | args(16)        | argcnt(1) | result(1) |
//! +------------+--------+-----------------+-----------+-----------+
//! ```
//!
//! `result` 只在发送后由设备填写，接收帧中无意义。

use crate::address::AddressByte;
use crate::message::{CecArgs, CecMessage, CecOpcode, MAX_MESSAGE_ARGS};

/// 帧内参数缓冲区大小（内核 ABI）
pub const FRAME_ARGS_CAPACITY: usize = 16;

/// 设备保证的最大接收参数个数
pub const MAX_FRAME_ARGS: usize = 15;

/// 设备交换帧（`#[repr(C)]`，可直接作为 ioctl 参数）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireFrame {
    /// (initiator << 4) | destination
    pub address: u8,
    pub opcode: u8,
    pub args: [u8; FRAME_ARGS_CAPACITY],
    pub arg_count: u8,
    /// 发送结果码（见 [`SendOutcome::from_result_code`]）
    pub result: u8,
}

impl WireFrame {
    /// 有效参数切片（按缓冲区长度截断）
    pub fn args(&self) -> &[u8] {
        let len = (self.arg_count as usize).min(FRAME_ARGS_CAPACITY);
        &self.args[..len]
    }

    /// 编码消息
    ///
    /// - 参数超过 14 个时 `arg_count` 置 0，参数被丢弃（不报错）
    /// - opcode 为 <Report Power Status> (0x90) 时 `args[0]` 强制为 0
    pub fn encode(message: &CecMessage) -> Self {
        let mut frame = WireFrame {
            address: AddressByte::pack(message.initiator, message.destination),
            opcode: message.opcode,
            ..Default::default()
        };

        let count = message.len() - 1;
        if count <= MAX_MESSAGE_ARGS {
            frame.args[..count].copy_from_slice(&message.args);
            frame.arg_count = count as u8;
        }

        if message.opcode == u8::from(CecOpcode::ReportPowerStatus) {
            frame.args[0] = 0;
        }

        frame
    }

    /// 解码为结构化消息（全函数，不校验 `arg_count`）
    pub fn decode(&self) -> CecMessage {
        let (initiator, destination) = AddressByte::unpack(self.address);
        CecMessage {
            initiator,
            destination,
            opcode: self.opcode,
            args: CecArgs::from_slice(self.args()),
        }
    }
}

impl From<&CecMessage> for WireFrame {
    fn from(message: &CecMessage) -> Self {
        WireFrame::encode(message)
    }
}

impl From<&WireFrame> for CecMessage {
    fn from(frame: &WireFrame) -> Self {
        frame.decode()
    }
}

/// 发送结果
///
/// 数值与 HAL 返回码一致：0 成功，1 NACK，2 忙，3 失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SendOutcome {
    Success = 0,
    Nack = 1,
    Busy = 2,
    Fail = 3,
}

impl SendOutcome {
    /// 映射设备写回的结果码：0/1/2 之外一律为 `Fail`
    pub fn from_result_code(code: u8) -> Self {
        match code {
            0 => SendOutcome::Success,
            1 => SendOutcome::Nack,
            2 => SendOutcome::Busy,
            _ => SendOutcome::Fail,
        }
    }

    pub fn is_success(self) -> bool {
        self == SendOutcome::Success
    }
}

impl std::fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SendOutcome::Success => "success",
            SendOutcome::Nack => "nack",
            SendOutcome::Busy => "busy",
            SendOutcome::Fail => "fail",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::LogicalAddress;
    use proptest::prelude::*;

    fn message(initiator: u8, destination: u8, opcode: u8, args: &[u8]) -> CecMessage {
        CecMessage::new(
            LogicalAddress::from_nibble(initiator),
            LogicalAddress::from_nibble(destination),
            opcode,
            args,
        )
    }

    #[test]
    fn test_wire_frame_layout() {
        assert_eq!(std::mem::size_of::<WireFrame>(), 20);
        assert_eq!(std::mem::align_of::<WireFrame>(), 1);
    }

    #[test]
    fn test_encode_active_source() {
        let frame = WireFrame::encode(&message(4, 15, 0x82, &[0x10, 0x00]));
        assert_eq!(frame.address, 0x4F);
        assert_eq!(frame.opcode, 0x82);
        assert_eq!(frame.arg_count, 2);
        assert_eq!(frame.args(), &[0x10, 0x00]);
        assert_eq!(frame.result, 0);
    }

    #[test]
    fn test_encode_opcode_only() {
        let frame = WireFrame::encode(&message(0, 4, 0x8F, &[]));
        assert_eq!(frame.address, 0x04);
        assert_eq!(frame.arg_count, 0);
        assert_eq!(frame.args, [0u8; FRAME_ARGS_CAPACITY]);
    }

    #[test]
    fn test_encode_exactly_fourteen_args_kept() {
        let args: Vec<u8> = (1..=14).collect();
        let frame = WireFrame::encode(&message(4, 0, 0x47, &args));
        assert_eq!(frame.arg_count, 14);
        assert_eq!(frame.args(), args.as_slice());
    }

    #[test]
    fn test_report_power_status_without_args_still_zeroed() {
        let frame = WireFrame::encode(&message(4, 0, 0x90, &[]));
        assert_eq!(frame.arg_count, 0);
        assert_eq!(frame.args[0], 0);
    }

    #[test]
    fn test_decode_bounds_arg_count_by_buffer() {
        let frame = WireFrame {
            address: 0x04,
            opcode: 0x89,
            args: [0xAB; FRAME_ARGS_CAPACITY],
            arg_count: 200,
            result: 0,
        };
        let msg = frame.decode();
        assert_eq!(msg.initiator, LogicalAddress::Tv);
        assert_eq!(msg.destination, LogicalAddress::Playback1);
        assert_eq!(msg.args.len(), FRAME_ARGS_CAPACITY);
    }

    #[test]
    fn test_decode_fifteen_args_from_device() {
        let mut args = [0u8; FRAME_ARGS_CAPACITY];
        for (i, b) in args.iter_mut().enumerate().take(MAX_FRAME_ARGS) {
            *b = i as u8;
        }
        let frame = WireFrame {
            address: 0x40,
            opcode: 0xA0,
            args,
            arg_count: MAX_FRAME_ARGS as u8,
            result: 0,
        };
        assert_eq!(frame.decode().args.len(), 15);
    }

    #[test]
    fn test_send_outcome_mapping() {
        assert_eq!(SendOutcome::from_result_code(0), SendOutcome::Success);
        assert_eq!(SendOutcome::from_result_code(1), SendOutcome::Nack);
        assert_eq!(SendOutcome::from_result_code(2), SendOutcome::Busy);
        assert_eq!(SendOutcome::from_result_code(3), SendOutcome::Fail);
        assert_eq!(SendOutcome::from_result_code(0xFF), SendOutcome::Fail);
        assert_eq!(u8::from(SendOutcome::Busy), 2);
        assert_eq!(SendOutcome::Nack.to_string(), "nack");
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            initiator in 0u8..16,
            destination in 0u8..16,
            opcode in any::<u8>().prop_filter("report power status is normalized", |op| *op != 0x90),
            args in prop::collection::vec(any::<u8>(), 0..=MAX_MESSAGE_ARGS),
        ) {
            let msg = message(initiator, destination, opcode, &args);
            prop_assert_eq!(WireFrame::encode(&msg).decode(), msg);
        }

        #[test]
        fn prop_oversized_args_are_dropped(
            opcode in any::<u8>(),
            args in prop::collection::vec(any::<u8>(), (MAX_MESSAGE_ARGS + 1)..64),
        ) {
            let frame = WireFrame::encode(&message(4, 0, opcode, &args));
            prop_assert_eq!(frame.arg_count, 0);
            prop_assert!(frame.decode().args.is_empty());
        }

        #[test]
        fn prop_report_power_status_arg_is_zero(
            status in any::<u8>(),
            extra in prop::collection::vec(any::<u8>(), 0..20),
        ) {
            let mut args = vec![status];
            args.extend(extra);
            let frame = WireFrame::encode(&message(4, 0, 0x90, &args));
            prop_assert_eq!(frame.args[0], 0);
        }

        #[test]
        fn prop_address_byte_layout(initiator in 0u8..16, destination in 0u8..16) {
            let frame = WireFrame::encode(&message(initiator, destination, 0x36, &[]));
            prop_assert_eq!(frame.address, (initiator << 4) | destination);
        }
    }
}
