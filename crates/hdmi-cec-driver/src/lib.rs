//! # HDMI-CEC Driver
//!
//! HAL 核心：
//! - 发送路径（等待总线空闲、编码、提交、结果码映射）
//! - 事件监控线程（状态节点 poll、热插拔 / 入站消息分流）
//! - 端口拓扑查询
//! - 面向平台的 [`HdmiCec`] 门面
//!
//! # 线程模型
//!
//! 调用方线程执行同步接口；监控线程独占状态节点并同步调用已注册的回调。
//! 两者的设备 IO 都经过同一个 [`DeviceHandle`] 互斥锁。

mod builder;
mod cec;
pub mod config;
mod error;
pub mod handle;
pub mod metrics;
pub mod monitor;
pub mod send;
pub mod sink;
pub mod topology;

pub use builder::HdmiCecBuilder;
pub use cec::HdmiCec;
pub use config::{DriverConfig, MonitorConfig, SendConfig};
pub use error::DriverError;
pub use handle::DeviceHandle;
pub use metrics::{CecMetrics, MetricsSnapshot};
pub use monitor::{EventMonitor, MonitorContext, MonitorState, StatusOpener, monitor_loop};
pub use send::SendPath;
pub use sink::{ChannelSink, EventSink, SinkSlot, channel_sink};

pub use hdmi_cec_device as device;
pub use hdmi_cec_protocol as protocol;
