//! 信息命令

use crate::session;
use anyhow::Result;
use clap::Args;
use hdmi_cec_driver::DriverConfig;

/// 信息参数
#[derive(Args, Debug)]
pub struct InfoCommand {
    /// 以 TOML 打印完整的生效配置
    #[arg(long)]
    pub toml: bool,
}

impl InfoCommand {
    pub fn execute(&self, config: DriverConfig) -> Result<()> {
        if self.toml {
            print!("{}", config.to_toml_string()?);
            return Ok(());
        }

        let cec = session::offline(config)?;
        let config = cec.config();
        println!("version:    {:#04x}", cec.version());
        println!("vendor id:  {:#08x}", cec.vendor_id());
        println!("device:     {}", config.device_path.display());
        println!("status:     {}", config.status_path.display());
        println!("state:      {}", config.connection_state_path.display());
        Ok(())
    }
}
