//! 连接状态命令

use crate::session;
use anyhow::Result;
use clap::Args;
use hdmi_cec_driver::DriverConfig;
use hdmi_cec_protocol::HDMI_CEC_PORT_ID;

/// 连接状态查询参数
#[derive(Args, Debug)]
pub struct ConnectedCommand {
    /// 端口 ID
    #[arg(short, long, default_value_t = HDMI_CEC_PORT_ID)]
    pub port: u32,
}

impl ConnectedCommand {
    /// 只读取连接状态文件，不打开设备节点
    pub fn execute(&self, config: DriverConfig) -> Result<()> {
        let cec = session::offline(config)?;
        let state = cec.is_connected(self.port)?;
        if state.is_connected() {
            println!("connected");
        } else {
            println!("not connected");
        }
        Ok(())
    }
}
