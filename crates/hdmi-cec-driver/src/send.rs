//! 发送路径
//!
//! 单次发送：等待总线空闲 → 编码 → 提交 → 映射设备结果码。
//! 本层不重发；重试策略属于调用方。

use crate::config::SendConfig;
use crate::error::DriverError;
use crate::handle::DeviceHandle;
use crate::metrics::CecMetrics;
use hdmi_cec_protocol::{CecMessage, MAX_MESSAGE_ARGS, SendOutcome, WireFrame};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use tracing::{debug, error, trace, warn};

/// 串行化的发送路径
#[derive(Debug)]
pub struct SendPath {
    device: Arc<DeviceHandle>,
    config: SendConfig,
    metrics: Arc<CecMetrics>,
    /// 同一时刻只有一个发送在进行
    in_flight: Mutex<()>,
}

impl SendPath {
    pub fn new(device: Arc<DeviceHandle>, config: SendConfig, metrics: Arc<CecMetrics>) -> Self {
        Self {
            device,
            config,
            metrics,
            in_flight: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SendConfig {
        &self.config
    }

    /// 发送一条消息
    ///
    /// # 返回
    /// - `Err(DriverError::NotOpen)`: 设备未打开，不触碰设备
    /// - `Ok(SendOutcome::Nack)`: 设备回 NACK，或等待空闲超过重试上限
    /// - `Ok(SendOutcome::Fail)`: 提交 ioctl 失败或未知结果码
    pub fn send(&self, message: &CecMessage) -> Result<SendOutcome, DriverError> {
        let _in_flight = self.in_flight.lock();

        if !self.device.is_open() {
            return Err(DriverError::NotOpen);
        }
        self.metrics.sends_total.fetch_add(1, Ordering::Relaxed);

        if !self.wait_for_idle()? {
            warn!(
                "Bus not idle after {} polls, reporting NACK for {}",
                self.config.max_idle_polls, message
            );
            self.metrics.idle_wait_exhausted.fetch_add(1, Ordering::Relaxed);
            self.metrics.record_outcome(SendOutcome::Nack);
            return Ok(SendOutcome::Nack);
        }

        if message.args.len() > MAX_MESSAGE_ARGS {
            warn!(
                "Message {} has {} args (max {}), sending opcode only",
                message,
                message.args.len(),
                MAX_MESSAGE_ARGS
            );
        }
        let mut frame = WireFrame::encode(message);

        let outcome = match self.device.with_device(|d| d.send_frame(&mut frame)) {
            Ok(()) => SendOutcome::from_result_code(frame.result),
            Err(DriverError::NotOpen) => return Err(DriverError::NotOpen),
            Err(e) => {
                error!("Failed to submit CEC frame {}: {}", message, e);
                SendOutcome::Fail
            },
        };

        trace!(
            "Sent {} (address=0x{:02X}, result={}) -> {}",
            message, frame.address, frame.result, outcome
        );
        self.metrics.record_outcome(outcome);
        Ok(outcome)
    }

    /// 轮询唤醒状态直到空闲；超过上限返回 `Ok(false)`
    ///
    /// 查询失败按"未空闲"计数。
    fn wait_for_idle(&self) -> Result<bool, DriverError> {
        let polls = self.config.max_idle_polls;
        let interval = self.config.idle_poll_interval();

        for attempt in 1..=polls {
            match self.device.with_device(|d| d.wake_state()) {
                Ok(0) => return Ok(true),
                Ok(state) => {
                    debug!("CEC wake state = {}, attempt {}/{}", state, attempt, polls);
                },
                Err(DriverError::NotOpen) => return Err(DriverError::NotOpen),
                Err(e) => {
                    warn!("Wake state query failed (attempt {}/{}): {}", attempt, polls, e);
                },
            }
            // 只在两次查询之间休眠：N 次查询对应 N-1 次休眠，最后一次查询后直接返回 NACK
            if attempt < polls {
                thread::sleep(interval);
            }
        }

        Ok(polls == 0)
    }
}
