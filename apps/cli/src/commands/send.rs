//! 发送命令
//!
//! 每次调用重新打开设备节点，发送一条消息后退出。

use crate::session;
use anyhow::{Context, Result, bail};
use clap::Args;
use hdmi_cec_driver::DriverConfig;
use hdmi_cec_protocol::{CecMessage, LogicalAddress, parse_hex_bytes, parse_opcode};

/// 发送参数
#[derive(Args, Debug)]
pub struct SendCommand {
    /// 发起方逻辑地址
    #[arg(long, default_value = "playback1")]
    pub from: LogicalAddress,

    /// 目标逻辑地址（`broadcast` = 15）
    #[arg(long)]
    pub to: LogicalAddress,

    /// 操作码（十六进制或名称，如 `04`、`0x36`、`standby`）
    #[arg(long, value_parser = parse_opcode)]
    pub opcode: u8,

    /// 参数字节（`10:00` 或 `"0x10 0x00"`）
    #[arg(long)]
    pub args: Option<String>,

    /// 发送前先声明发起方地址
    #[arg(long)]
    pub claim: bool,
}

impl SendCommand {
    /// 构造消息，拒绝超长参数
    pub fn message(&self) -> Result<CecMessage> {
        let args = match &self.args {
            Some(s) => parse_hex_bytes(s).context("Invalid --args")?,
            None => Vec::new(),
        };
        let msg = CecMessage::try_new(self.from, self.to, self.opcode, &args)?;
        Ok(msg)
    }

    pub fn execute(&self, config: DriverConfig) -> Result<()> {
        let msg = self.message()?;
        let cec = session::open(config)?;

        if self.claim {
            cec.claim(self.from)?;
        }

        let outcome = cec.send(&msg)?;
        println!("{} -> {}", msg, outcome);
        if !outcome.is_success() {
            bail!("send {} failed: {}", msg, outcome);
        }
        Ok(())
    }
}
