//! 运行指标
//!
//! 原子计数器，任何线程都可以无锁读取。被静默丢弃的状态码与读失败在这里留痕。

use hdmi_cec_protocol::SendOutcome;
use std::sync::atomic::{AtomicU64, Ordering};

/// CEC 驱动指标
#[derive(Debug, Default)]
pub struct CecMetrics {
    /// 状态源唤醒次数（有紧急数据）
    pub wakeups: AtomicU64,
    /// poll 失败次数
    pub poll_errors: AtomicU64,
    /// 状态文本读取失败次数
    pub status_read_errors: AtomicU64,
    /// 分发的热插拔事件数
    pub hotplug_events: AtomicU64,
    /// 成功读取并解码的入站消息数
    pub messages_received: AtomicU64,
    /// 状态码为 2 但读帧失败的次数（消息丢失）
    pub frame_read_errors: AtomicU64,
    /// 无法识别的状态码次数
    pub unclassified_codes: AtomicU64,
    /// 没有注册回调时产生的事件数
    pub events_undelivered: AtomicU64,
    /// 回调 panic 次数（事件已丢弃，监控线程继续运行）
    pub callback_panics: AtomicU64,

    /// 发送调用总数（设备已打开）
    pub sends_total: AtomicU64,
    pub sends_success: AtomicU64,
    pub sends_nack: AtomicU64,
    pub sends_busy: AtomicU64,
    pub sends_fail: AtomicU64,
    /// 等待空闲超过重试上限（计入 NACK）
    pub idle_wait_exhausted: AtomicU64,
}

impl CecMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_outcome(&self, outcome: SendOutcome) {
        let counter = match outcome {
            SendOutcome::Success => &self.sends_success,
            SendOutcome::Nack => &self.sends_nack,
            SendOutcome::Busy => &self.sends_busy,
            SendOutcome::Fail => &self.sends_fail,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            wakeups: self.wakeups.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
            status_read_errors: self.status_read_errors.load(Ordering::Relaxed),
            hotplug_events: self.hotplug_events.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            frame_read_errors: self.frame_read_errors.load(Ordering::Relaxed),
            unclassified_codes: self.unclassified_codes.load(Ordering::Relaxed),
            events_undelivered: self.events_undelivered.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
            sends_total: self.sends_total.load(Ordering::Relaxed),
            sends_success: self.sends_success.load(Ordering::Relaxed),
            sends_nack: self.sends_nack.load(Ordering::Relaxed),
            sends_busy: self.sends_busy.load(Ordering::Relaxed),
            sends_fail: self.sends_fail.load(Ordering::Relaxed),
            idle_wait_exhausted: self.idle_wait_exhausted.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in [
            &self.wakeups,
            &self.poll_errors,
            &self.status_read_errors,
            &self.hotplug_events,
            &self.messages_received,
            &self.frame_read_errors,
            &self.unclassified_codes,
            &self.events_undelivered,
            &self.callback_panics,
            &self.sends_total,
            &self.sends_success,
            &self.sends_nack,
            &self.sends_busy,
            &self.sends_fail,
            &self.idle_wait_exhausted,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub wakeups: u64,
    pub poll_errors: u64,
    pub status_read_errors: u64,
    pub hotplug_events: u64,
    pub messages_received: u64,
    pub frame_read_errors: u64,
    pub unclassified_codes: u64,
    pub events_undelivered: u64,
    pub callback_panics: u64,
    pub sends_total: u64,
    pub sends_success: u64,
    pub sends_nack: u64,
    pub sends_busy: u64,
    pub sends_fail: u64,
    pub idle_wait_exhausted: u64,
}

impl MetricsSnapshot {
    /// 被静默丢弃的入站数据（读帧失败 + 未识别状态码）
    pub fn silently_dropped(&self) -> u64 {
        self.frame_read_errors + self.unclassified_codes
    }

    /// 发送成功率（百分比），无发送时为 0.0
    pub fn send_success_rate(&self) -> f64 {
        if self.sends_total == 0 {
            return 0.0;
        }
        (self.sends_success as f64 / self.sends_total as f64) * 100.0
    }
}
