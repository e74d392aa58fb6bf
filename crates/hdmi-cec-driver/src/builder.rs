//! Builder 模式实现
//!
//! 提供链式构造 `HdmiCec` 实例的便捷方式。

use crate::cec::HdmiCec;
use crate::config::DriverConfig;
use crate::error::DriverError;
use crate::handle::DeviceHandle;
use crate::metrics::CecMetrics;
use crate::monitor::{EventMonitor, MonitorContext, StatusOpener};
use crate::sink::SinkSlot;
use hdmi_cec_device::{CecDevice, DeviceError, StatusSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// 设备来源
enum DeviceChoice {
    /// 打开配置中的设备节点
    Node,
    Custom(Box<dyn CecDevice>),
    None,
}

/// 状态源来源
enum StatusChoice {
    /// 打开配置中的状态节点
    Node,
    Custom(StatusOpener),
    Disabled,
}

/// HdmiCec Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use hdmi_cec_driver::{DriverConfig, HdmiCecBuilder};
///
/// // 使用默认路径
/// let cec = HdmiCecBuilder::new().build().unwrap();
///
/// // 从配置文件加载
/// let config = DriverConfig::load("/etc/hdmi-cec.toml").unwrap();
/// let cec = HdmiCecBuilder::new().config(config).build().unwrap();
/// ```
pub struct HdmiCecBuilder {
    config: DriverConfig,
    device: DeviceChoice,
    status: StatusChoice,
}

impl Default for HdmiCecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HdmiCecBuilder {
    pub fn new() -> Self {
        Self {
            config: DriverConfig::default(),
            device: DeviceChoice::Node,
            status: StatusChoice::Node,
        }
    }

    /// 替换整个配置（之后的路径设置仍然生效）
    pub fn config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn device_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.device_path = path.into();
        self
    }

    pub fn status_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.status_path = path.into();
        self
    }

    pub fn connection_state_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.connection_state_path = path.as_ref().to_path_buf();
        self
    }

    /// 使用自定义设备（例如 mock）
    pub fn with_device(mut self, device: impl CecDevice + 'static) -> Self {
        self.device = DeviceChoice::Custom(Box::new(device));
        self
    }

    /// 不打开设备：同步接口返回 `NotOpen`
    pub fn without_device(mut self) -> Self {
        self.device = DeviceChoice::None;
        self
    }

    /// 使用自定义状态源
    pub fn with_status_source(self, source: impl StatusSource + 'static) -> Self {
        self.with_status_opener(move || Ok(Box::new(source) as Box<dyn StatusSource>))
    }

    /// 使用自定义状态源打开函数（在监控线程上调用）
    pub fn with_status_opener<F>(mut self, opener: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn StatusSource>, DeviceError> + Send + 'static,
    {
        self.status = StatusChoice::Custom(Box::new(opener));
        self
    }

    /// 不启动监控线程
    pub fn without_monitor(mut self) -> Self {
        self.status = StatusChoice::Disabled;
        self
    }

    /// 构建 HdmiCec 实例
    ///
    /// 设备节点打开失败只记录日志，句柄保持"未打开"，与监控线程一样不影响构建。
    ///
    /// # Errors
    /// - `DriverError::MonitorSpawn`: 监控线程创建失败
    pub fn build(self) -> Result<HdmiCec, DriverError> {
        let config = self.config;

        let device = match self.device {
            DeviceChoice::Node => open_device_node(&config.device_path),
            DeviceChoice::Custom(device) => Some(device),
            DeviceChoice::None => None,
        };
        let device = Arc::new(DeviceHandle::from_boxed(device));
        let sink = Arc::new(SinkSlot::new());
        let metrics = Arc::new(CecMetrics::new());

        let opener = match self.status {
            StatusChoice::Node => Some(status_node_opener(config.status_path.clone())),
            StatusChoice::Custom(opener) => Some(opener),
            StatusChoice::Disabled => None,
        };

        let monitor = match opener {
            Some(opener) => {
                let ctx = MonitorContext {
                    device: device.clone(),
                    sink: sink.clone(),
                    metrics: metrics.clone(),
                };
                Some(EventMonitor::start(opener, ctx, &config.monitor)?)
            },
            None => None,
        };

        Ok(HdmiCec::from_parts(config, device, sink, metrics, monitor))
    }
}

#[cfg(target_os = "linux")]
fn open_device_node(path: &Path) -> Option<Box<dyn CecDevice>> {
    match hdmi_cec_device::IoctlCecDevice::open(path) {
        Ok(device) => {
            info!("Opened CEC device {}", path.display());
            Some(Box::new(device))
        },
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            None
        },
    }
}

#[cfg(not(target_os = "linux"))]
fn open_device_node(path: &Path) -> Option<Box<dyn CecDevice>> {
    error!(
        "CEC device nodes are only supported on Linux, not opening {}",
        path.display()
    );
    None
}

#[cfg(target_os = "linux")]
fn status_node_opener(path: PathBuf) -> StatusOpener {
    Box::new(move || {
        let source = hdmi_cec_device::SysfsStatusSource::open(&path)?;
        Ok(Box::new(source) as Box<dyn StatusSource>)
    })
}

#[cfg(not(target_os = "linux"))]
fn status_node_opener(path: PathBuf) -> StatusOpener {
    Box::new(move || {
        Err(DeviceError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("status node {} requires Linux", path.display()),
        )))
    })
}
