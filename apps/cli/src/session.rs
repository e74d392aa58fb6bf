//! 全局参数与 HAL 实例构造

use anyhow::{Context, Result};
use clap::Args;
use hdmi_cec_driver::{DriverConfig, HdmiCec, HdmiCecBuilder};
use std::path::PathBuf;

/// 全局参数（命令行优先于配置文件）
#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// TOML 配置文件
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// CEC 设备节点（覆盖配置）
    #[arg(long, global = true)]
    pub device: Option<PathBuf>,

    /// 状态节点（覆盖配置）
    #[arg(long, global = true)]
    pub status: Option<PathBuf>,

    /// HDMI 连接状态文件（覆盖配置）
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,
}

impl SessionArgs {
    /// 加载配置文件并应用命令行覆盖
    pub fn load_config(&self) -> Result<DriverConfig> {
        let mut config = match &self.config {
            Some(path) => DriverConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => DriverConfig::default(),
        };

        if let Some(device) = &self.device {
            config.device_path = device.clone();
        }
        if let Some(status) = &self.status {
            config.status_path = status.clone();
        }
        if let Some(state) = &self.state {
            config.connection_state_path = state.clone();
        }
        Ok(config)
    }
}

/// 打开设备节点，不启动监控线程
pub fn open(config: DriverConfig) -> Result<HdmiCec> {
    let cec = HdmiCecBuilder::new().config(config).without_monitor().build()?;
    Ok(cec)
}

/// 打开设备节点并启动监控线程
pub fn open_with_monitor(config: DriverConfig) -> Result<HdmiCec> {
    let cec = HdmiCecBuilder::new().config(config).build()?;
    Ok(cec)
}

/// 不触碰任何设备节点（只读取配置与状态文件）
pub fn offline(config: DriverConfig) -> Result<HdmiCec> {
    let cec = HdmiCecBuilder::new()
        .config(config)
        .without_device()
        .without_monitor()
        .build()?;
    Ok(cec)
}
