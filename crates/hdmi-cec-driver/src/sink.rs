//! 事件回调
//!
//! 平台注册的回调存放在 [`SinkSlot`] 中：注册是一次原子发布，
//! 监控线程每次分发时读取最新的回调（后注册者覆盖先注册者）。
//!
//! ```rust
//! use hdmi_cec_driver::sink::{SinkSlot, channel_sink};
//! use hdmi_cec_protocol::HdmiEvent;
//!
//! let slot = SinkSlot::new();
//! let (sink, rx) = channel_sink(16);
//! slot.register(sink);
//!
//! slot.dispatch(&HdmiEvent::HotPlug { connected: true, port_id: 1 });
//! assert!(rx.try_recv().is_ok());
//! ```

use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use hdmi_cec_protocol::HdmiEvent;
use std::sync::Arc;
use tracing::warn;

/// 事件回调 Trait
///
/// 在监控线程上同步调用，实现应尽快返回（推荐转发到 channel）。
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &HdmiEvent);
}

impl<F> EventSink for F
where
    F: Fn(&HdmiEvent) + Send + Sync,
{
    fn on_event(&self, event: &HdmiEvent) {
        self(event)
    }
}

/// 转发到有界 channel 的回调（`try_send`，满时丢弃并告警）
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<HdmiEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<HdmiEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: &HdmiEvent) {
        match self.sender.try_send(event.clone()) {
            Ok(()) => {},
            Err(TrySendError::Full(event)) => {
                warn!("Event channel full, dropping {}", event);
            },
            Err(TrySendError::Disconnected(event)) => {
                warn!("Event receiver dropped, discarding {}", event);
            },
        }
    }
}

/// 创建 channel 回调及其接收端
pub fn channel_sink(capacity: usize) -> (ChannelSink, Receiver<HdmiEvent>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (ChannelSink::new(tx), rx)
}

/// 回调槽位
#[derive(Default)]
pub struct SinkSlot {
    sink: ArcSwapOption<Box<dyn EventSink>>,
}

impl SinkSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册回调（替换之前的回调）
    pub fn register(&self, sink: impl EventSink + 'static) {
        let sink: Box<dyn EventSink> = Box::new(sink);
        self.sink.store(Some(Arc::new(sink)));
    }

    pub fn clear(&self) {
        self.sink.store(None);
    }

    pub fn is_registered(&self) -> bool {
        self.sink.load().is_some()
    }

    /// 分发事件；没有回调时返回 `false`
    pub fn dispatch(&self, event: &HdmiEvent) -> bool {
        match self.sink.load_full() {
            Some(sink) => {
                sink.on_event(event);
                true
            },
            None => false,
        }
    }
}

impl std::fmt::Debug for SinkSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkSlot")
            .field("registered", &self.is_registered())
            .finish()
    }
}
