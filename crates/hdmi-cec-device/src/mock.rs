//! Mock 后端（无硬件依赖）
//!
//! 设备和状态源都是共享句柄：测试保留一份 clone 用来编排行为和检查调用记录，
//! 另一份交给驱动层。

use crate::{CecCommand, CecDevice, DeviceError, StatusSource};
use hdmi_cec_protocol::{LogicalAddress, PhysicalAddress, WireFrame};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn scripted_failure(command: CecCommand) -> DeviceError {
    DeviceError::ioctl(command, std::io::Error::other(format!("scripted {} failure", command)))
}

#[derive(Debug, Default)]
struct DeviceState {
    logical_address: Option<LogicalAddress>,
    physical_address: Option<u16>,
    enabled: Option<bool>,
    /// 依次返回的唤醒状态；耗尽后返回 `idle_wake_state`
    wake_states: VecDeque<Result<i32, ()>>,
    idle_wake_state: i32,
    /// 依次写回的结果码；耗尽后写回 0
    result_codes: VecDeque<u8>,
    fail_send: bool,
    fail_commands: Vec<CecCommand>,
    inbound: VecDeque<WireFrame>,
    sent: Vec<WireFrame>,
    calls: Vec<CecCommand>,
}

/// 可编排的 CEC 设备
#[derive(Debug, Clone, Default)]
pub struct MockCecDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockCecDevice {
    /// 空闲、物理地址 `1.0.0.0` 的设备
    pub fn new() -> Self {
        let device = Self::default();
        device.set_physical_address(Some(0x1000));
        device
    }

    /// `None` 表示物理地址查询失败
    pub fn set_physical_address(&self, addr: Option<u16>) {
        self.state.lock().physical_address = addr;
    }

    /// 每次都返回同一个唤醒状态
    pub fn set_wake_state(&self, value: i32) {
        let mut state = self.state.lock();
        state.wake_states.clear();
        state.idle_wake_state = value;
    }

    /// 在默认状态之前依次返回给定的唤醒状态
    pub fn queue_wake_states(&self, values: impl IntoIterator<Item = i32>) {
        self.state.lock().wake_states.extend(values.into_iter().map(Ok));
    }

    /// 下一次唤醒状态查询失败
    pub fn queue_wake_state_error(&self) {
        self.state.lock().wake_states.push_back(Err(()));
    }

    pub fn queue_result_code(&self, code: u8) {
        self.state.lock().result_codes.push_back(code);
    }

    /// 发送 ioctl 本身报错
    pub fn set_send_fails(&self, fails: bool) {
        self.state.lock().fail_send = fails;
    }

    /// 指定命令一律报错（发送请用 [`Self::set_send_fails`]）
    pub fn fail_command(&self, command: CecCommand) {
        self.state.lock().fail_commands.push(command);
    }

    pub fn queue_inbound(&self, frame: WireFrame) {
        self.state.lock().inbound.push_back(frame);
    }

    pub fn logical_address(&self) -> Option<LogicalAddress> {
        self.state.lock().logical_address
    }

    pub fn enabled(&self) -> Option<bool> {
        self.state.lock().enabled
    }

    pub fn sent_frames(&self) -> Vec<WireFrame> {
        self.state.lock().sent.clone()
    }

    /// 按调用顺序记录的命令
    pub fn calls(&self) -> Vec<CecCommand> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, command: CecCommand) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == command).count()
    }

    fn record(&self, command: CecCommand) -> Result<MutexGuard<'_, DeviceState>, DeviceError> {
        let mut state = self.state.lock();
        state.calls.push(command);
        if state.fail_commands.contains(&command) {
            return Err(scripted_failure(command));
        }
        Ok(state)
    }
}

impl CecDevice for MockCecDevice {
    fn set_logical_address(&mut self, addr: LogicalAddress) -> Result<(), DeviceError> {
        let mut state = self.record(CecCommand::SetLogicalAddress)?;
        state.logical_address = Some(addr);
        Ok(())
    }

    fn clear_logical_address(&mut self) -> Result<(), DeviceError> {
        let mut state = self.record(CecCommand::ClearLogicalAddress)?;
        state.logical_address = None;
        Ok(())
    }

    fn physical_address(&mut self) -> Result<PhysicalAddress, DeviceError> {
        let state = self.record(CecCommand::PhysicalAddress)?;
        state
            .physical_address
            .map(PhysicalAddress)
            .ok_or_else(|| scripted_failure(CecCommand::PhysicalAddress))
    }

    fn send_frame(&mut self, frame: &mut WireFrame) -> Result<(), DeviceError> {
        let mut state = self.record(CecCommand::SendFrame)?;
        if state.fail_send {
            return Err(scripted_failure(CecCommand::SendFrame));
        }
        frame.result = state.result_codes.pop_front().unwrap_or(0);
        state.sent.push(*frame);
        Ok(())
    }

    fn read_frame(&mut self) -> Result<WireFrame, DeviceError> {
        let mut state = self.record(CecCommand::ReadFrame)?;
        state
            .inbound
            .pop_front()
            .ok_or_else(|| scripted_failure(CecCommand::ReadFrame))
    }

    fn wake_state(&mut self) -> Result<i32, DeviceError> {
        let mut state = self.record(CecCommand::WakeState)?;
        match state.wake_states.pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(())) => Err(scripted_failure(CecCommand::WakeState)),
            None => Ok(state.idle_wake_state),
        }
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), DeviceError> {
        let mut state = self.record(CecCommand::SetEnabled)?;
        state.enabled = Some(enabled);
        Ok(())
    }
}

#[derive(Debug)]
enum StatusStep {
    Payload(String),
    PollError,
    ReadError,
}

#[derive(Debug, Default)]
struct StatusState {
    steps: VecDeque<StatusStep>,
    current: Option<String>,
    read_error: bool,
    waits: usize,
    reads: usize,
}

#[derive(Debug, Default)]
struct StatusShared {
    state: Mutex<StatusState>,
    changed: Condvar,
}

/// 可编排的状态源
///
/// 每个排队的步骤唤醒一次 `wait_for_change`：
/// - `push_code` / `push_payload`: 唤醒，随后 `read_status` 返回该文本
/// - `push_poll_error`: `wait_for_change` 返回错误
/// - `push_read_error`: 唤醒，随后 `read_status` 返回错误
#[derive(Debug, Clone, Default)]
pub struct MockStatusSource {
    shared: Arc<StatusShared>,
}

impl MockStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开即存在的旧通知内容
    pub fn with_initial(payload: impl Into<String>) -> Self {
        let source = Self::default();
        source.shared.state.lock().current = Some(payload.into());
        source
    }

    pub fn push_code(&self, code: i32) {
        self.push_payload(format!("{}\n", code));
    }

    pub fn push_payload(&self, payload: impl Into<String>) {
        self.push(StatusStep::Payload(payload.into()));
    }

    pub fn push_poll_error(&self) {
        self.push(StatusStep::PollError);
    }

    pub fn push_read_error(&self) {
        self.push(StatusStep::ReadError);
    }

    /// `wait_for_change` 被调用的次数
    pub fn wait_count(&self) -> usize {
        self.shared.state.lock().waits
    }

    /// `read_status` 被调用的次数
    pub fn read_count(&self) -> usize {
        self.shared.state.lock().reads
    }

    /// 尚未被消费的步骤数
    pub fn pending(&self) -> usize {
        self.shared.state.lock().steps.len()
    }

    fn push(&self, step: StatusStep) {
        self.shared.state.lock().steps.push_back(step);
        self.shared.changed.notify_all();
    }
}

impl StatusSource for MockStatusSource {
    fn wait_for_change(&mut self, timeout: Option<Duration>) -> Result<bool, DeviceError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.shared.state.lock();
        state.waits += 1;

        loop {
            if let Some(step) = state.steps.pop_front() {
                match step {
                    StatusStep::Payload(payload) => {
                        state.current = Some(payload);
                        state.read_error = false;
                    },
                    StatusStep::ReadError => state.read_error = true,
                    StatusStep::PollError => {
                        return Err(DeviceError::Io(std::io::Error::other("scripted poll failure")));
                    },
                }
                return Ok(true);
            }

            match deadline {
                Some(deadline) => {
                    if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                        return Ok(false);
                    }
                },
                None => self.shared.changed.wait(&mut state),
            }
        }
    }

    fn read_status(&mut self) -> Result<String, DeviceError> {
        let mut state = self.shared.state.lock();
        state.reads += 1;
        if state.read_error {
            state.read_error = false;
            return Err(DeviceError::Io(std::io::Error::other("scripted read failure")));
        }
        Ok(state.current.clone().unwrap_or_default())
    }
}
