//! 逻辑地址 / 物理地址命令

use crate::session;
use anyhow::Result;
use clap::Args;
use hdmi_cec_driver::DriverConfig;
use hdmi_cec_protocol::LogicalAddress;

/// 声明逻辑地址参数
#[derive(Args, Debug)]
pub struct ClaimCommand {
    /// 逻辑地址（`4`、`0x4` 或 `playback1`）
    pub address: LogicalAddress,
}

impl ClaimCommand {
    pub fn execute(&self, config: DriverConfig) -> Result<()> {
        let cec = session::open(config)?;
        cec.claim(self.address)?;
        println!("claimed {}", self.address);
        Ok(())
    }
}

/// 清除所有逻辑地址
pub fn clear(config: DriverConfig) -> Result<()> {
    let cec = session::open(config)?;
    cec.clear()?;
    println!("cleared");
    Ok(())
}

/// 打印物理地址
pub fn physical(config: DriverConfig) -> Result<()> {
    let cec = session::open(config)?;
    let addr = cec.physical_address()?;
    println!("{}", addr);
    Ok(())
}
