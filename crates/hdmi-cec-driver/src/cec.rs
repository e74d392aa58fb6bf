//! HAL 门面
//!
//! 提供对外的 `HdmiCec` 结构体，封装设备句柄、发送路径与监控线程。

use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::handle::DeviceHandle;
use crate::metrics::{CecMetrics, MetricsSnapshot};
use crate::monitor::{EventMonitor, MonitorState};
use crate::send::SendPath;
use crate::sink::{EventSink, SinkSlot, channel_sink};
use crate::topology;
use crossbeam_channel::Receiver;
use hdmi_cec_protocol::{
    CecMessage, CecOption, ConnectionState, HDMI_CEC_VENDOR_ID, HDMI_CEC_VERSION, HdmiEvent,
    LogicalAddress, PhysicalAddress, PortInfo, SendOutcome,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// HDMI-CEC HAL
///
/// 通过 [`HdmiCecBuilder`](crate::HdmiCecBuilder) 创建。同步接口可从任意线程调用；
/// 异步事件在监控线程上通过已注册的回调送达。
///
/// # Example
///
/// ```no_run
/// use hdmi_cec_driver::HdmiCecBuilder;
/// use hdmi_cec_protocol::{CecMessage, LogicalAddress};
///
/// let cec = HdmiCecBuilder::new().build().unwrap();
/// let events = cec.register_channel(64);
///
/// cec.claim(LogicalAddress::Playback1).unwrap();
/// let msg = CecMessage::new(LogicalAddress::Playback1, LogicalAddress::Tv, 0x04u8, &[]);
/// let outcome = cec.send(&msg).unwrap();
/// println!("image view on: {}", outcome);
///
/// for event in events.iter() {
///     println!("{}", event);
/// }
/// ```
pub struct HdmiCec {
    config: DriverConfig,
    device: Arc<DeviceHandle>,
    send_path: SendPath,
    sink: Arc<SinkSlot>,
    metrics: Arc<CecMetrics>,
    monitor: Option<EventMonitor>,
}

impl HdmiCec {
    pub(crate) fn from_parts(
        config: DriverConfig,
        device: Arc<DeviceHandle>,
        sink: Arc<SinkSlot>,
        metrics: Arc<CecMetrics>,
        monitor: Option<EventMonitor>,
    ) -> Self {
        let send_path = SendPath::new(device.clone(), config.send.clone(), metrics.clone());
        Self {
            config,
            device,
            send_path,
            sink,
            metrics,
            monitor,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 设备节点是否已打开
    pub fn is_open(&self) -> bool {
        self.device.is_open()
    }

    /// 声明逻辑地址
    pub fn claim(&self, addr: LogicalAddress) -> Result<(), DriverError> {
        info!("Claiming logical address {}", addr);
        self.device.with_device(|d| d.set_logical_address(addr))
    }

    /// 清除所有已声明的逻辑地址
    pub fn clear(&self) -> Result<(), DriverError> {
        info!("Clearing logical addresses");
        self.device.with_device(|d| d.clear_logical_address())
    }

    pub fn physical_address(&self) -> Result<PhysicalAddress, DriverError> {
        self.device.with_device(|d| d.physical_address())
    }

    /// 发送一条消息（见 [`SendPath::send`]）
    pub fn send(&self, message: &CecMessage) -> Result<SendOutcome, DriverError> {
        debug!("Sending {}", message);
        self.send_path.send(message)
    }

    /// 注册事件回调（替换之前的回调）
    pub fn register_callback(&self, sink: impl EventSink + 'static) {
        info!("Registering event callback");
        self.sink.register(sink);
    }

    /// 注册一个有界 channel 作为回调，返回接收端
    pub fn register_channel(&self, capacity: usize) -> Receiver<HdmiEvent> {
        let (sink, rx) = channel_sink(capacity);
        self.register_callback(sink);
        rx
    }

    pub fn version(&self) -> u32 {
        HDMI_CEC_VERSION
    }

    pub fn vendor_id(&self) -> u32 {
        HDMI_CEC_VENDOR_ID
    }

    pub fn query_ports(&self) -> Vec<PortInfo> {
        topology::query_ports(&self.device)
    }

    /// 设置选项；只有 [`CecOption::Enable`] 作用到设备
    pub fn set_option(&self, flag: i32, value: i32) -> Result<(), DriverError> {
        match CecOption::from(flag) {
            CecOption::Enable => {
                info!("Setting CEC enable = {}", value);
                self.device.with_device(|d| d.set_enabled(value != 0))
            },
            other => {
                debug!("Ignoring option {:?} = {}", other, value);
                Ok(())
            },
        }
    }

    /// ARC 不支持，只记录日志
    pub fn set_arc(&self, port_id: u32, enabled: bool) {
        info!("set_arc(port={}, enabled={}) is not supported", port_id, enabled);
    }

    /// 读取 HDMI 连接状态文件（与设备句柄无关）
    ///
    /// 只有一个端口，`port_id` 不参与判断。
    pub fn is_connected(&self, port_id: u32) -> Result<ConnectionState, DriverError> {
        let path = &self.config.connection_state_path;
        let content = std::fs::read_to_string(path).map_err(|e| {
            warn!("Failed to read {}: {}", path.display(), e);
            DriverError::Device(e.into())
        })?;

        let state = match content.trim_start().as_bytes().first() {
            Some(b'1') => ConnectionState::Connected,
            _ => ConnectionState::NotConnected,
        };
        debug!("Port {} connection state: {:?}", port_id, state);
        Ok(state)
    }

    /// 监控线程状态（`None` 表示未启动监控）
    pub fn monitor_state(&self) -> Option<MonitorState> {
        self.monitor.as_ref().map(EventMonitor::state)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// 停止监控线程并关闭设备
    pub fn shutdown(&mut self) {
        if let Some(mut monitor) = self.monitor.take() {
            monitor.shutdown();
        }
        self.device.close();
    }
}

impl Drop for HdmiCec {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for HdmiCec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdmiCec")
            .field("device", &self.device)
            .field("monitor", &self.monitor_state())
            .field("sink", &self.sink)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::HdmiCecBuilder;
    use hdmi_cec_device::CecCommand;
    use hdmi_cec_device::mock::MockCecDevice;

    fn cec_with(mock: &MockCecDevice) -> HdmiCec {
        HdmiCecBuilder::new()
            .with_device(mock.clone())
            .without_monitor()
            .build()
            .unwrap()
    }

    #[test]
    fn test_constants() {
        let cec = cec_with(&MockCecDevice::new());
        assert_eq!(cec.version(), 0x05);
        assert_eq!(cec.vendor_id(), 0x000001);
        assert_eq!(cec.monitor_state(), None);
    }

    #[test]
    fn test_set_option_only_enable_reaches_device() {
        let mock = MockCecDevice::new();
        let cec = cec_with(&mock);

        cec.set_option(1, 0).unwrap();
        assert_eq!(mock.enabled(), Some(false));
        cec.set_option(1, 1).unwrap();
        assert_eq!(mock.enabled(), Some(true));

        cec.set_option(2, 1).unwrap();
        cec.set_option(99, 1).unwrap();
        assert_eq!(mock.call_count(CecCommand::SetEnabled), 2);
    }

    #[test]
    fn test_claim_error_propagates() {
        let mock = MockCecDevice::new();
        mock.fail_command(CecCommand::SetLogicalAddress);
        let cec = cec_with(&mock);
        assert!(matches!(
            cec.claim(LogicalAddress::Playback1),
            Err(DriverError::Device(_))
        ));
    }

    #[test]
    fn test_is_connected_reads_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        let mut config = DriverConfig::default();
        config.connection_state_path = path.clone();

        let cec = HdmiCecBuilder::new()
            .config(config)
            .with_device(MockCecDevice::new())
            .without_monitor()
            .build()
            .unwrap();

        // 文件不存在
        assert!(cec.is_connected(1).is_err());

        std::fs::write(&path, "1\n").unwrap();
        assert_eq!(cec.is_connected(1).unwrap(), ConnectionState::Connected);
        std::fs::write(&path, "0\n").unwrap();
        assert_eq!(cec.is_connected(1).unwrap(), ConnectionState::NotConnected);
        std::fs::write(&path, "").unwrap();
        assert_eq!(cec.is_connected(7).unwrap(), ConnectionState::NotConnected);
    }

    #[test]
    fn test_is_connected_without_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        std::fs::write(&path, "1").unwrap();

        let mut cec = HdmiCecBuilder::new()
            .connection_state_path(&path)
            .without_device()
            .without_monitor()
            .build()
            .unwrap();
        assert!(!cec.is_open());
        assert!(cec.is_connected(1).unwrap().is_connected());

        cec.shutdown();
        assert!(cec.is_connected(1).unwrap().is_connected());
    }

    #[test]
    fn test_shutdown_closes_device() {
        let mut cec = cec_with(&MockCecDevice::new());
        assert!(cec.is_open());
        cec.shutdown();
        assert!(!cec.is_open());
        assert!(matches!(cec.physical_address(), Err(DriverError::NotOpen)));
    }
}
