//! 驱动配置
//!
//! 所有字段都有默认值，空 TOML 文件即为合法配置：
//!
//! ```toml
//! device_path = "/dev/cec"
//! status_path = "/sys/devices/virtual/misc/cec/stat"
//! connection_state_path = "/sys/devices/virtual/switch/hdmi/state"
//!
//! [send]
//! max_idle_polls = 30
//! idle_poll_interval_ms = 40
//!
//! [monitor]
//! poll_timeout_ms = 500   # 0 = 无限等待
//! thread_name = "HdmiCecThread"
//! join_timeout_ms = 2000
//! ```

use crate::error::DriverError;
use hdmi_cec_device::{DEFAULT_CONNECTION_STATE_PATH, DEFAULT_DEVICE_PATH, DEFAULT_STATUS_PATH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 驱动配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// CEC 设备节点
    pub device_path: PathBuf,
    /// 可 poll 的状态节点
    pub status_path: PathBuf,
    /// HDMI 连接状态文件
    pub connection_state_path: PathBuf,
    pub send: SendConfig,
    pub monitor: MonitorConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            status_path: PathBuf::from(DEFAULT_STATUS_PATH),
            connection_state_path: PathBuf::from(DEFAULT_CONNECTION_STATE_PATH),
            send: SendConfig::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl DriverConfig {
    /// 从 TOML 文本解析
    pub fn from_toml_str(content: &str) -> Result<Self, DriverError> {
        toml::from_str(content).map_err(|e| DriverError::Config(e.to_string()))
    }

    /// 从文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML 文本
    pub fn to_toml_string(&self) -> Result<String, DriverError> {
        toml::to_string_pretty(self).map_err(|e| DriverError::Config(e.to_string()))
    }
}

/// 发送路径配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    /// 等待总线空闲的最大查询次数（0 = 不等待）
    pub max_idle_polls: u32,
    /// 两次查询之间的休眠时间
    pub idle_poll_interval_ms: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            max_idle_polls: 30,
            idle_poll_interval_ms: 40,
        }
    }
}

impl SendConfig {
    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms)
    }
}

/// 事件监控配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 单次 poll 的最长等待时间（0 = 无限等待，无法及时响应退出请求）
    pub poll_timeout_ms: u64,
    /// 监控线程名
    pub thread_name: String,
    /// 退出时等待线程结束的超时
    pub join_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 500,
            thread_name: "HdmiCecThread".to_string(),
            join_timeout_ms: 2000,
        }
    }
}

impl MonitorConfig {
    pub fn poll_timeout(&self) -> Option<Duration> {
        match self.poll_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}
